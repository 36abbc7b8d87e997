use crate::application_port::SessionError;
use crate::domain_model::{IssuedToken, SessionId, TokenClaims, TokenKind, TokenLifetimes, UserId};
use chrono::{DateTime, Utc};

/// Stateless signer and verifier. Never blocks, never touches the store.
pub trait TokenIssuer: Send + Sync {
    /// Access tokens name only the user; they are never tied to stored session state.
    fn issue_access(&self, user: &UserId, issued_at: DateTime<Utc>)
    -> Result<IssuedToken, SessionError>;

    fn issue_refresh(
        &self,
        user: &UserId,
        session: &SessionId,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, SessionError>;

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, SessionError>;

    /// One-way keyed hash of a refresh token, safe to persist.
    fn fingerprint(&self, refresh_token: &str) -> Result<String, SessionError>;

    fn fingerprint_matches(&self, refresh_token: &str, fingerprint: &str) -> bool;

    fn lifetimes(&self) -> TokenLifetimes;
}
