use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// TTL key-value capability backing session state. Every call is idempotent from
/// the caller's side: `set` overwrites, `delete` of a missing key is a no-op.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically read and remove a key. Of several concurrent callers at most one
    /// receives the value.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Backends only understand whole seconds; anything shorter still gets one.
pub fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
