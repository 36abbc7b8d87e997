mod revocation;
mod session;
mod token;
mod user;

pub use revocation::*;
pub use session::*;
pub use token::*;
pub use user::*;
