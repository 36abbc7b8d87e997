mod bounded_session_store;
mod fingerprint;
mod jwt_token_issuer;
mod revocation_index_store;
mod session_manager;

pub use bounded_session_store::*;
pub use fingerprint::*;
pub use jwt_token_issuer::*;
pub use revocation_index_store::*;
pub use session_manager::*;
