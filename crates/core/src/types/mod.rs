//! Core types for Katha Vault.
//!
//! Type-safe wrappers for ids and email addresses, plus the small status
//! enums shared by the server and the CLI.

pub mod email;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
