use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// 21 characters from the URL-safe nanoid alphabet, roughly 126 bits of entropy.
    pub fn generate() -> Self {
        SessionId(nanoid::nanoid!())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn store_key(&self) -> String {
        format!("session:{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SessionId(s.to_string()))
    }
}

/// What the store keeps under `session:{id}`. Its presence is what makes the session active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: UserId,
    /// Keyed hash of the only refresh token currently accepted for this session.
    pub refresh_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub last_rotated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: UserId, refresh_fingerprint: String, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            refresh_fingerprint,
            created_at: now,
            last_rotated_at: now,
        }
    }

    pub fn rotated(&self, refresh_fingerprint: String, now: DateTime<Utc>) -> Self {
        Self {
            user_id: self.user_id.clone(),
            refresh_fingerprint,
            created_at: self.created_at,
            last_rotated_at: now,
        }
    }
}
