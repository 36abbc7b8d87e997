use crate::domain_model::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that can be forcibly invalidated: one session, or every session of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectId {
    Session(SessionId),
    User(UserId),
}

impl SubjectId {
    /// Session ids never contain `:`, so the `user:` namespace cannot collide with them.
    pub fn store_key(&self) -> String {
        match self {
            SubjectId::Session(sid) => format!("revoked:{}", sid),
            SubjectId::User(uid) => format!("revoked:user:{}", uid),
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::Session(sid) => write!(f, "session {}", sid),
            SubjectId::User(uid) => write!(f, "user {}", uid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub subject_id: SubjectId,
    pub revoked_at: DateTime<Utc>,
}

impl RevocationEntry {
    pub fn new(subject_id: SubjectId, revoked_at: DateTime<Utc>) -> Self {
        Self {
            subject_id,
            revoked_at,
        }
    }
}
