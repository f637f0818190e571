//! Server-side models that are not part of the domain.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
