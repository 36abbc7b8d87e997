use crate::domain_model::{SessionId, TokenPair, UserId};
use crate::domain_port::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token malformed")]
    TokenMalformed,
    #[error("token signature invalid")]
    TokenSignatureInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("session not found")]
    SessionNotFound,
    #[error("session revoked")]
    SessionRevoked,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl SessionError {
    /// Only store outages are worth a retry; everything else is terminal for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::StoreUnavailable(_))
    }
}

impl From<StoreError> for SessionError {
    fn from(error: StoreError) -> Self {
        SessionError::StoreUnavailable(error.to_string())
    }
}

/// The contract offered to the HTTP layer and any other upstream collaborator.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn login(&self, user_id: UserId) -> Result<TokenPair, SessionError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;
    async fn logout(&self, session_id: &SessionId) -> Result<(), SessionError>;
    async fn verify_access(&self, access_token: &str) -> Result<UserId, SessionError>;
    /// Invalidates every token of the user issued up to now, e.g. after a password change.
    async fn revoke_user(&self, user_id: &UserId) -> Result<(), SessionError>;
}
