/// Walks one session through its whole lifecycle against the in-memory store:
/// login, rotation, replay of the rotated token, logout.
///
/// $ cargo run --bin session_demo
use sessionkeeper::application_port::SessionService;
use sessionkeeper::domain_model::UserId;
use sessionkeeper::domain_port::{Clock, SessionStore};
use sessionkeeper::infra_memory::{ManualClock, MemorySessionStore};
use sessionkeeper::logger::*;
use sessionkeeper::server::Server;
use sessionkeeper::settings::parse_settings_with_env;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "sessionkeeper=debug".to_string(),
    })?;

    let settings = parse_settings_with_env(None, |name| match name {
        "ACCESS_TOKEN_SECRET" => Some("demo-access-secret".to_string()),
        "REFRESH_TOKEN_SECRET" => Some("demo-refresh-secret".to_string()),
        _ => None,
    })?;

    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let store = Arc::new(MemorySessionStore::new(clock.clone()));
    let server = Server::with_components(&settings, store.clone(), clock.clone());
    let service = server.session_service.clone();

    let first = service.login(UserId::new("u1")).await?;
    let key = first.session_id.store_key();
    println!("login -> session {}", first.session_id);
    println!("  {} ttl {:?}", key, store.ttl(&key));

    clock.advance(Duration::from_secs(60 * 60));
    let second = service.refresh(&first.refresh_token.0).await?;
    println!("refresh(R1) -> new pair, {} ttl {:?}", key, store.ttl(&key));

    let replay = service.refresh(&first.refresh_token.0).await;
    println!("refresh(R1) again -> {:?}", replay.map(|_| ()));

    let verified = service.verify_access(&second.access_token.0).await;
    println!("verify(A2) -> {:?}", verified);

    service.logout(&first.session_id).await?;
    println!(
        "logout -> {} present: {}",
        key,
        store.get(&key).await?.is_some()
    );

    let after = service.refresh(&second.refresh_token.0).await;
    println!("refresh(R2) -> {:?}", after.map(|_| ()));
    println!("now {}", clock.now());

    Ok(())
}
