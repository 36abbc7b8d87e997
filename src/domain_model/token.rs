use crate::domain_model::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

/// Payload carried by both token kinds. `sid` is mandatory on refresh tokens.
/// `iat_ms` is the issue instant in milliseconds; revocations are ordered against it
/// since `iat` only has whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64,
    pub iat_ms: i64,
    pub exp: i64,
    pub jti: String,
}

impl TokenClaims {
    pub fn session_id(&self) -> Option<SessionId> {
        self.sid.clone().map(SessionId)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub session_id: SessionId,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub issued_at: DateTime<Utc>,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Durations every other component derives its expiries and TTLs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
    pub clock_skew: Duration,
}

impl TokenLifetimes {
    /// Longest time an already issued access token can still pass verification.
    pub fn max_access_exposure(&self) -> Duration {
        self.access + self.clock_skew
    }

    pub fn max_refresh_exposure(&self) -> Duration {
        self.refresh + self.clock_skew
    }
}
