mod clock;
mod revocation_index;
mod session_store;

pub use clock::*;
pub use revocation_index::*;
pub use session_store::*;
