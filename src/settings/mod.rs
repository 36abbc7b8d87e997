//! Settings are layered: built-in defaults, then the TOML file, then the
//! recognised environment variables (`ACCESS_TOKEN_SECRET`, `STORE_URL`, ...).

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
