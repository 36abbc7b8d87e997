use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;

/// Composition root: builds the session manager and everything it depends on
/// from an immutable `Settings` value.
pub struct Server {
    pub session_manager: Arc<SessionManager>,
    pub session_service: Arc<dyn SessionService>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let backend: Arc<dyn SessionStore> = match settings.store.backend.as_str() {
            "redis" => {
                let conn = connect(&settings.store.url).await?;
                Arc::new(RedisSessionStore::new(
                    conn,
                    settings.store.key_prefix.clone(),
                ))
            }
            "memory" => {
                warn!("memory store selected, sessions are not shared between processes");
                Arc::new(MemorySessionStore::new(clock.clone()))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };
        info!(backend = %settings.store.backend, "session store connected");
        let session_store: Arc<dyn SessionStore> = Arc::new(BoundedSessionStore::new(
            backend,
            settings.store.op_timeout,
        ));

        Ok(Self::with_components(settings, session_store, clock))
    }

    /// Wires the manager onto an already built store; used for in-process setups.
    pub fn with_components(
        settings: &Settings,
        session_store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auth = &settings.auth;
        let token_issuer: Arc<dyn TokenIssuer> = Arc::new(JwtHs256Issuer::new(
            JwtConfig {
                access_secret: auth.access_token_secret.clone().into_bytes(),
                refresh_secret: auth.refresh_token_secret.clone().into_bytes(),
                access_ttl: auth.access_token_expiry,
                refresh_ttl: auth.refresh_token_expiry,
                clock_skew: auth.clock_skew,
            },
            clock.clone(),
        ));
        let revocation_index: Arc<dyn RevocationIndex> =
            Arc::new(StoreRevocationIndex::new(session_store.clone()));

        let session_manager = Arc::new(SessionManager::new(
            token_issuer,
            session_store,
            revocation_index,
            clock,
        ));

        info!(?auth, "session manager ready");

        Self {
            session_service: session_manager.clone(),
            session_manager,
        }
    }
}
