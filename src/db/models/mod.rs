//! Database models split into domain-specific modules.

pub mod session;
pub mod todo;
pub mod user;

pub use session::*;
pub use todo::*;
pub use user::*;
