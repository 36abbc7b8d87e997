use crate::domain_port::{SessionStore, StoreError, ttl_secs};
use crate::logger::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    /// An empty prefix keeps the bare `session:` / `revoked:` layout.
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, value, ttl_secs(ttl))
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let val: Option<String> = conn.get(&key).await.map_err(unavailable)?;
        Ok(val)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = conn.del(&key).await.map_err(unavailable)?;
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        // GETDEL needs Redis >= 6.2
        let val: Option<String> = conn.get_del(&key).await.map_err(unavailable)?;
        Ok(val)
    }
}

/// Opens a managed connection and checks it answers before anything is built on it.
pub async fn connect(url: &str) -> anyhow::Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    let mut manager = client.get_connection_manager().await?;
    let pong: String = redis::cmd("PING").query_async(&mut manager).await?;
    debug!(%pong, "store reachable");
    Ok(manager)
}
