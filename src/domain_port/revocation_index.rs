use crate::domain_model::{RevocationEntry, SubjectId};
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// TTL-bounded set of forcibly invalidated sessions and users. Consulted on every
/// access-token verification, so lookups must stay a single cache read.
#[async_trait::async_trait]
pub trait RevocationIndex: Send + Sync {
    async fn add(&self, entry: RevocationEntry, ttl: Duration) -> Result<(), StoreError>;

    async fn revoked_at(&self, subject: &SubjectId) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn contains(&self, subject: &SubjectId) -> Result<bool, StoreError> {
        Ok(self.revoked_at(subject).await?.is_some())
    }
}
