mod clock_manual;
mod session_store_memory;

pub use clock_manual::*;
pub use session_store_memory::*;
