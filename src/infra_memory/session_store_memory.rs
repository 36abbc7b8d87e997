use crate::domain_port::{Clock, SessionStore, StoreError, ttl_secs};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-process TTL store driven by an injectable clock. Expired keys are dropped
/// lazily on access. Per-key operations are atomic, which is all rotation needs.
pub struct MemorySessionStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Remaining lifetime of a live key.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if !entry.is_live(now) {
            return None;
        }
        (entry.expires_at - now).to_std().ok()
    }

    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|e| e.value().is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = i64::try_from(ttl_secs(ttl))
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| self.clock.now().checked_add_signed(delta))
            .ok_or_else(|| StoreError::Unavailable(format!("ttl out of range: {:?}", ttl)))?;
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .remove(key)
            .map(|(_, entry)| entry)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;
    use chrono::TimeZone;

    fn store() -> (MemorySessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        (MemorySessionStore::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn keys_expire_after_ttl() {
        let (store, clock) = store();
        store
            .set("session:s1", "v1", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.ttl("session:s1"), Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(9));
        assert_eq!(store.get("session:s1").await.unwrap().as_deref(), Some("v1"));

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get("session:s1").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn set_overwrites_and_resets_ttl() {
        let (store, clock) = store();
        store.set("k", "old", Duration::from_secs(10)).await.unwrap();
        clock.advance(Duration::from_secs(8));
        store.set("k", "new", Duration::from_secs(10)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn take_hands_out_a_value_once() {
        let (store, _) = store();
        store.set("k", "v", Duration::from_secs(10)).await.unwrap();

        assert_eq!(store.take("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.take("k").await.unwrap(), None);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn take_ignores_expired_values() {
        let (store, clock) = store();
        store.set("k", "v", Duration::from_secs(1)).await.unwrap();
        clock.advance(Duration::from_secs(2));
        assert_eq!(store.take("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_ttl_is_rejected() {
        let (store, _) = store();
        for secs in [u64::MAX, i64::MAX as u64 / 2, 1_000_000_000_000_000] {
            assert!(matches!(
                store.set("k", "v", Duration::from_secs(secs)).await,
                Err(StoreError::Unavailable(_))
            ));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (store, _) = store();
        store.set("k", "v", Duration::from_secs(10)).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
