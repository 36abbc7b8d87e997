use crate::domain_port::{SessionStore, StoreError};
use crate::logger::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Puts a deadline on every store call. A call that overruns is reported as
/// `StoreError::Timeout`, which callers treat exactly like an outage.
pub struct BoundedSessionStore {
    inner: Arc<dyn SessionStore>,
    limit: Duration,
}

impl BoundedSessionStore {
    pub fn new(inner: Arc<dyn SessionStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, limit = ?self.limit, "store call timed out");
                Err(StoreError::Timeout(self.limit))
            }
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for BoundedSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.bounded("set", self.inner.set(key, value, ttl)).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.bounded("take", self.inner.take(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StalledStore;

    #[async_trait::async_trait]
    impl SessionStore for StalledStore {
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn take(&self, _key: &str) -> Result<Option<String>, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_calls_time_out() {
        let store = BoundedSessionStore::new(Arc::new(StalledStore), Duration::from_millis(250));

        assert!(matches!(
            store.get("session:s1").await,
            Err(StoreError::Timeout(limit)) if limit == Duration::from_millis(250)
        ));
        assert!(matches!(
            store.set("session:s1", "{}", Duration::from_secs(1)).await,
            Err(StoreError::Timeout(_))
        ));
        assert!(matches!(store.take("session:s1").await, Err(StoreError::Timeout(_))));
        assert!(matches!(store.delete("session:s1").await, Err(StoreError::Timeout(_))));
    }
}
