use super::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "sessionkeeper", about = "Token and session lifecycle operations")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a session for an already authenticated user
    Login { user_id: String },
    /// Rotate a refresh token into a new token pair
    Refresh { refresh_token: String },
    /// End a session
    Logout { session_id: String },
    /// Check an access token and print its user
    Verify { access_token: String },
    /// Invalidate every token issued to a user so far
    RevokeUser { user_id: String },
    /// Show the stored record of a session
    Inspect { session_id: String },
}
