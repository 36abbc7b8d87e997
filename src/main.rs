use sessionkeeper::application_port::SessionService;
use sessionkeeper::domain_model::{SessionId, UserId};
use sessionkeeper::logger::*;
use sessionkeeper::server::*;
use sessionkeeper::settings::*;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let server = Server::try_new(&project_settings).await?;
    let service = server.session_service.clone();

    let output = match cli.command {
        Command::Login { user_id } => {
            let pair = service.login(UserId::new(user_id)).await?;
            json!(pair)
        }
        Command::Refresh { refresh_token } => {
            let pair = service.refresh(&refresh_token).await?;
            json!(pair)
        }
        Command::Logout { session_id } => {
            service.logout(&SessionId(session_id)).await?;
            json!({ "logged_out": true })
        }
        Command::Verify { access_token } => {
            let user_id = service.verify_access(&access_token).await?;
            json!({ "user_id": user_id })
        }
        Command::RevokeUser { user_id } => {
            service.revoke_user(&UserId::new(user_id)).await?;
            json!({ "revoked": true })
        }
        Command::Inspect { session_id } => {
            let record = server.session_manager.inspect(&SessionId(session_id)).await?;
            json!(record)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
