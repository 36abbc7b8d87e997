use crate::application_port::{SessionError, SessionService, TokenIssuer};
use crate::domain_model::{
    AccessToken, RefreshToken, RevocationEntry, SessionId, SessionRecord, SubjectId, TokenClaims,
    TokenKind, TokenPair, UserId,
};
use crate::domain_port::{Clock, RevocationIndex, SessionStore};
use crate::logger::*;
use std::sync::Arc;

/// Session lifecycle on top of a stateless signer and a shared TTL store.
///
/// Holds no mutable state of its own: any number of instances may serve the same
/// store concurrently, and every decision about session validity is made by the store.
///
/// Refresh tokens are single use. A refresh atomically takes the session record out of
/// the store, so of several callers presenting the same token only one can see the
/// record with a matching fingerprint. Presenting a token whose fingerprint no longer
/// matches means an already rotated token was replayed; the whole session is revoked.
pub struct SessionManager {
    token_issuer: Arc<dyn TokenIssuer>,
    session_store: Arc<dyn SessionStore>,
    revocation_index: Arc<dyn RevocationIndex>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        token_issuer: Arc<dyn TokenIssuer>,
        session_store: Arc<dyn SessionStore>,
        revocation_index: Arc<dyn RevocationIndex>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token_issuer,
            session_store,
            revocation_index,
            clock,
        }
    }

    /// Reads the stored record of a session without touching it.
    pub async fn inspect(&self, session_id: &SessionId) -> Result<SessionRecord, SessionError> {
        let raw = self
            .session_store
            .get(&session_id.store_key())
            .await?
            .ok_or(SessionError::SessionNotFound)?;
        Self::decode_record(&raw)
    }

    fn issue_pair(&self, user_id: &UserId, session_id: &SessionId) -> Result<TokenPair, SessionError> {
        let now = self.clock.now();
        let access = self.token_issuer.issue_access(user_id, now)?;
        let refresh = self.token_issuer.issue_refresh(user_id, session_id, now)?;

        Ok(TokenPair {
            session_id: session_id.clone(),
            access_token: AccessToken(access.token),
            refresh_token: RefreshToken(refresh.token),
            issued_at: refresh.issued_at,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }

    /// The record TTL is the configured refresh lifetime, the same value the
    /// issuer adds to `iat` for the refresh token's `exp`.
    async fn write_record(
        &self,
        session_id: &SessionId,
        record: &SessionRecord,
    ) -> Result<(), SessionError> {
        let value =
            serde_json::to_string(record).map_err(|e| SessionError::InternalError(e.to_string()))?;
        let ttl = self.token_issuer.lifetimes().refresh;
        self.session_store
            .set(&session_id.store_key(), &value, ttl)
            .await?;
        Ok(())
    }

    fn decode_record(raw: &str) -> Result<SessionRecord, SessionError> {
        serde_json::from_str(raw)
            .map_err(|e| SessionError::InternalError(format!("corrupt session record: {}", e)))
    }

    async fn revoke_session(&self, session_id: &SessionId) -> Result<(), SessionError> {
        let entry = RevocationEntry::new(SubjectId::Session(session_id.clone()), self.clock.now());
        let ttl = self.token_issuer.lifetimes().max_access_exposure();
        self.revocation_index.add(entry, ttl).await?;
        Ok(())
    }

    /// Only refresh claims name a session. Session revocations are absolute; a user
    /// revocation hits tokens issued no later than the millisecond it was recorded in.
    async fn ensure_not_revoked(&self, claims: &TokenClaims) -> Result<(), SessionError> {
        if let Some(session_id) = claims.session_id() {
            if self
                .revocation_index
                .contains(&SubjectId::Session(session_id))
                .await?
            {
                return Err(SessionError::SessionRevoked);
            }
        }

        let user = SubjectId::User(UserId::new(claims.sub.clone()));
        if let Some(revoked_at) = self.revocation_index.revoked_at(&user).await? {
            if claims.iat_ms <= revoked_at.timestamp_millis() {
                return Err(SessionError::SessionRevoked);
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionService for SessionManager {
    async fn login(&self, user_id: UserId) -> Result<TokenPair, SessionError> {
        let session_id = SessionId::generate();
        let pair = self.issue_pair(&user_id, &session_id)?;

        let fingerprint = self.token_issuer.fingerprint(&pair.refresh_token.0)?;
        let record = SessionRecord::new(user_id.clone(), fingerprint, pair.issued_at);
        self.write_record(&session_id, &record).await?;

        info!(%session_id, %user_id, "session created");
        Ok(pair)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self.token_issuer.verify(refresh_token, TokenKind::Refresh)?;
        let session_id = claims.session_id().ok_or(SessionError::TokenMalformed)?;
        let user_id = UserId::new(claims.sub.clone());
        let key = session_id.store_key();

        if let Err(e) = self.ensure_not_revoked(&claims).await {
            if matches!(e, SessionError::SessionRevoked) {
                self.session_store.delete(&key).await?;
                debug!(%session_id, %user_id, "refresh rejected, subject revoked");
            }
            return Err(e);
        }

        // Single-writer-wins: only one caller can take the record out. A miss is either
        // a dead session or a replay racing the rotation, so it revokes like a mismatch.
        let Some(raw) = self.session_store.take(&key).await? else {
            warn!(%session_id, %user_id, "refresh without an active session, revoking session");
            self.revoke_session(&session_id).await?;
            return Err(SessionError::SessionRevoked);
        };
        let record = Self::decode_record(&raw)?;

        let matches = record.user_id == user_id
            && self
                .token_issuer
                .fingerprint_matches(refresh_token, &record.refresh_fingerprint);
        if !matches {
            warn!(%session_id, %user_id, "refresh token reuse detected, revoking session");
            self.revoke_session(&session_id).await?;
            return Err(SessionError::SessionRevoked);
        }

        let pair = self.issue_pair(&user_id, &session_id).inspect_err(|e| {
            error!(%session_id, error = %e, "session dropped, could not issue rotated tokens");
        })?;
        let fingerprint = self.token_issuer.fingerprint(&pair.refresh_token.0)?;
        let rotated = record.rotated(fingerprint, pair.issued_at);
        self.write_record(&session_id, &rotated)
            .await
            .inspect_err(|e| {
                error!(%session_id, error = %e, "session dropped, could not store rotated record");
            })?;

        info!(%session_id, %user_id, "session rotated");
        Ok(pair)
    }

    async fn logout(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.session_store.delete(&session_id.store_key()).await?;
        self.revoke_session(session_id).await?;

        info!(%session_id, "session logged out");
        Ok(())
    }

    async fn verify_access(&self, access_token: &str) -> Result<UserId, SessionError> {
        let claims = self.token_issuer.verify(access_token, TokenKind::Access)?;
        self.ensure_not_revoked(&claims).await?;
        Ok(UserId::new(claims.sub))
    }

    async fn revoke_user(&self, user_id: &UserId) -> Result<(), SessionError> {
        let entry = RevocationEntry::new(SubjectId::User(user_id.clone()), self.clock.now());
        let ttl = self.token_issuer.lifetimes().max_refresh_exposure();
        self.revocation_index.add(entry, ttl).await?;

        warn!(%user_id, "all sessions of user revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{JwtConfig, JwtHs256Issuer, StoreRevocationIndex};
    use crate::domain_port::StoreError;
    use crate::infra_memory::{ManualClock, MemorySessionStore};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Memory store that can be switched into an outage, or into failing only
    /// session record writes.
    struct FlakyStore {
        inner: MemorySessionStore,
        down: AtomicBool,
        session_writes_down: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.down.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionStore for FlakyStore {
        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
            self.check()?;
            if key.starts_with("session:") && self.session_writes_down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("write rejected".to_string()));
            }
            self.inner.set(key, value, ttl).await
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.check()?;
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.check()?;
            self.inner.delete(key).await
        }

        async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.check()?;
            self.inner.take(key).await
        }
    }

    fn manager() -> (SessionManager, Arc<FlakyStore>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(FlakyStore {
            inner: MemorySessionStore::new(clock.clone()),
            down: AtomicBool::new(false),
            session_writes_down: AtomicBool::new(false),
        });
        let issuer = Arc::new(JwtHs256Issuer::new(
            JwtConfig {
                access_secret: b"access-secret".to_vec(),
                refresh_secret: b"refresh-secret".to_vec(),
                access_ttl: Duration::from_secs(15 * 60),
                refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
                clock_skew: Duration::from_secs(30),
            },
            clock.clone(),
        ));
        let index = Arc::new(StoreRevocationIndex::new(store.clone()));
        (SessionManager::new(issuer, store.clone(), index, clock), store)
    }

    #[tokio::test]
    async fn login_fails_closed_when_store_is_down() {
        let (manager, store) = manager();
        store.down.store(true, Ordering::SeqCst);

        let err = manager.login(UserId::new("u1")).await.unwrap_err();
        assert!(matches!(err, SessionError::StoreUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn refresh_and_verify_fail_closed_when_store_is_down() {
        let (manager, store) = manager();
        let pair = manager.login(UserId::new("u1")).await.unwrap();

        store.down.store(true, Ordering::SeqCst);
        assert!(matches!(
            manager.refresh(&pair.refresh_token.0).await,
            Err(SessionError::StoreUnavailable(_))
        ));
        assert!(matches!(
            manager.verify_access(&pair.access_token.0).await,
            Err(SessionError::StoreUnavailable(_))
        ));
        assert!(matches!(
            manager.logout(&pair.session_id).await,
            Err(SessionError::StoreUnavailable(_))
        ));

        store.down.store(false, Ordering::SeqCst);
        assert!(manager.refresh(&pair.refresh_token.0).await.is_ok());
    }

    #[tokio::test]
    async fn failed_rotation_write_loses_the_session() {
        let (manager, store) = manager();
        let pair = manager.login(UserId::new("u1")).await.unwrap();

        store.session_writes_down.store(true, Ordering::SeqCst);
        let err = manager.refresh(&pair.refresh_token.0).await.unwrap_err();
        assert!(matches!(err, SessionError::StoreUnavailable(_)));

        store.session_writes_down.store(false, Ordering::SeqCst);
        assert_eq!(
            store.get(&pair.session_id.store_key()).await.unwrap(),
            None
        );
        assert!(matches!(
            manager.refresh(&pair.refresh_token.0).await,
            Err(SessionError::SessionRevoked)
        ));
    }

    #[tokio::test]
    async fn refresh_of_a_missing_session_revokes_it() {
        let (manager, store) = manager();
        let pair = manager.login(UserId::new("u1")).await.unwrap();
        store.delete(&pair.session_id.store_key()).await.unwrap();

        assert!(matches!(
            manager.refresh(&pair.refresh_token.0).await,
            Err(SessionError::SessionRevoked)
        ));
        assert!(
            store
                .get(&format!("revoked:{}", pair.session_id))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn inspect_reports_missing_sessions() {
        let (manager, _) = manager();
        let pair = manager.login(UserId::new("u1")).await.unwrap();

        let record = manager.inspect(&pair.session_id).await.unwrap();
        assert_eq!(record.user_id, UserId::new("u1"));
        assert_eq!(record.created_at, pair.issued_at);
        assert_ne!(record.refresh_fingerprint, pair.refresh_token.0);

        manager.logout(&pair.session_id).await.unwrap();
        assert!(matches!(
            manager.inspect(&pair.session_id).await,
            Err(SessionError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn corrupt_record_is_not_accepted() {
        let (manager, store) = manager();
        let pair = manager.login(UserId::new("u1")).await.unwrap();
        store
            .set(
                &pair.session_id.store_key(),
                "garbage",
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(matches!(
            manager.refresh(&pair.refresh_token.0).await,
            Err(SessionError::InternalError(_))
        ));
    }
}
