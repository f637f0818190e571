//! Authentication service.
//!
//! Email + password accounts. Passwords are hashed with Argon2id and kept in
//! the `credentials` document, apart from the public profile.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

use katha_vault_core::validation::limits;
use katha_vault_core::{Email, User, UserRole, ValidationErrors, Validator};

use crate::config::KathaConfig;
use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::db::Store;

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignUp {
    /// Check every field and parse the email.
    fn validate(&self) -> Result<Email, ValidationErrors> {
        let email = Email::parse(&self.email);
        let mut v = Validator::new();
        v.text("name", &self.name, limits::NAME)
            .username("username", &self.username)
            .check(
                "email",
                email.is_ok(),
                email
                    .as_ref()
                    .err()
                    .map_or_else(String::new, ToString::to_string),
            )
            .check(
                "password",
                self.password.chars().count() >= limits::PASSWORD.0,
                format!("must be at least {} characters", limits::PASSWORD.0),
            )
            .check(
                "password",
                self.password.chars().count() <= limits::PASSWORD.1,
                format!("must be at most {} characters", limits::PASSWORD.1),
            );
        v.finish()?;
        email.map_err(|e| ValidationErrors::single("email", e.to_string()))
    }
}

/// Authentication service.
///
/// Handles account registration and password sign-in.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    config: &'a KathaConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a Store, config: &'a KathaConfig) -> Self {
        Self {
            users: UserRepository::new(store),
            config,
        }
    }

    /// Register a new account.
    ///
    /// Emails on the configured admin list receive the admin role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` if a field fails validation.
    /// Returns `AuthError::UserAlreadyExists` if the email or username is taken.
    pub async fn register(&self, form: SignUp) -> Result<User, AuthError> {
        let email = form.validate().map_err(AuthError::Invalid)?;
        let password_hash = hash_password(&form.password)?;
        let role = if self.config.is_admin_email(&email) {
            UserRole::Admin
        } else {
            UserRole::Reader
        };

        let user = self
            .users
            .create(NewUser {
                name: form.name,
                username: form.username,
                email,
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::Deactivated` if the password is right but the
    /// account has been deactivated.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.active {
            return Err(AuthError::Deactivated);
        }
        Ok(user)
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
