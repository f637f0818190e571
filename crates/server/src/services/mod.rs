//! Business logic services.

pub mod auth;
pub mod uploads;

pub use auth::{AuthError, AuthService, SignUp};
pub use uploads::{UploadError, UploadedCover};
