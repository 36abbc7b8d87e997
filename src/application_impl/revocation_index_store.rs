use crate::domain_model::{RevocationEntry, SubjectId};
use crate::domain_port::{RevocationIndex, SessionStore, StoreError};
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Revocation set kept as plain TTL keys (`revoked:{subject}`) in the session store.
pub struct StoreRevocationIndex {
    store: Arc<dyn SessionStore>,
}

impl StoreRevocationIndex {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl RevocationIndex for StoreRevocationIndex {
    async fn add(&self, entry: RevocationEntry, ttl: Duration) -> Result<(), StoreError> {
        let key = entry.subject_id.store_key();
        let value = serde_json::to_string(&entry)
            .map_err(|e| StoreError::Unavailable(format!("encode revocation: {}", e)))?;
        self.store.set(&key, &value, ttl).await
    }

    async fn revoked_at(&self, subject: &SubjectId) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = self.store.get(&subject.store_key()).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<RevocationEntry>(&raw) {
            Ok(entry) => Ok(Some(entry.revoked_at)),
            Err(e) => {
                // The key exists, so the subject is revoked; without a timestamp every token is.
                warn!(%subject, error = %e, "unreadable revocation entry");
                Ok(Some(DateTime::<Utc>::MAX_UTC))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::{SessionId, UserId};
    use crate::domain_port::Clock;
    use crate::infra_memory::{ManualClock, MemorySessionStore};
    use chrono::TimeZone;

    fn setup() -> (StoreRevocationIndex, Arc<MemorySessionStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemorySessionStore::new(clock.clone()));
        (StoreRevocationIndex::new(store.clone()), store, clock)
    }

    #[tokio::test]
    async fn entries_expire_with_their_ttl() {
        let (index, store, clock) = setup();
        let subject = SubjectId::Session(SessionId("s1".to_string()));

        index
            .add(
                RevocationEntry::new(subject.clone(), clock.now()),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        assert!(index.contains(&subject).await.unwrap());
        assert_eq!(store.ttl("revoked:s1"), Some(Duration::from_secs(60)));

        clock.advance(Duration::from_secs(61));
        assert!(!index.contains(&subject).await.unwrap());
    }

    #[tokio::test]
    async fn keeps_revocation_time() {
        let (index, _, clock) = setup();
        let subject = SubjectId::User(UserId::new("u1"));
        let at = clock.now();

        index
            .add(RevocationEntry::new(subject.clone(), at), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(index.revoked_at(&subject).await.unwrap(), Some(at));
        assert_eq!(
            index
                .revoked_at(&SubjectId::User(UserId::new("u2")))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn unreadable_entry_still_counts_as_revoked() {
        let (index, store, _) = setup();
        store
            .set("revoked:s9", "{not json", Duration::from_secs(60))
            .await
            .unwrap();
        let subject = SubjectId::Session(SessionId("s9".to_string()));
        assert!(index.contains(&subject).await.unwrap());
    }
}
