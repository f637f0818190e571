//! User repository: profiles (`users`) and password hashes (`credentials`).
//!
//! Profiles and credentials live in separate documents so that profile
//! listings never carry password hashes.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use katha_vault_core::types::next_id;
use katha_vault_core::user::ProfileUpdate;
use katha_vault_core::validation::normalize_username;
use katha_vault_core::{Email, User, UserId, UserRole};

use super::{RepositoryError, Store, keys};

/// Stored password hash for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialRecord {
    user_id: UserId,
    password_hash: String,
}

/// Input for a new account; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub role: UserRole,
}

/// Repository for user profiles and credentials.
pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        self.store.get_or_default(keys::USERS).await
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|u| u.id == id))
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|u| &u.email == email))
    }

    /// Get a user by handle (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let wanted = normalize_username(username);
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|u| u.username == wanted))
    }

    /// Create a new account with its password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or username is taken.
    /// Returns `RepositoryError::Database` for other storage errors.
    pub async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let NewUser {
            name,
            username,
            email,
            password_hash,
            role,
        } = new_user;
        let username = normalize_username(&username);

        let user = self
            .store
            .update(keys::USERS, |users: &mut Vec<User>| {
                if users.iter().any(|u| u.email == email) {
                    return Err(RepositoryError::Conflict("email already exists".to_owned()));
                }
                if users.iter().any(|u| u.username == username) {
                    return Err(RepositoryError::Conflict("username already exists".to_owned()));
                }
                let user = User {
                    id: next_id(users.iter().map(|u| u.id)),
                    name: name.trim().to_owned(),
                    username,
                    avatar: None,
                    bio: String::new(),
                    active: true,
                    email,
                    role,
                    created_at: Utc::now(),
                };
                users.push(user.clone());
                Ok(user)
            })
            .await?;

        let user_id = user.id;
        self.store
            .update(keys::CREDENTIALS, |records: &mut Vec<CredentialRecord>| {
                records.retain(|r| r.user_id != user_id);
                records.push(CredentialRecord {
                    user_id,
                    password_hash,
                });
                Ok::<_, RepositoryError>(())
            })
            .await?;

        Ok(user)
    }

    /// Get a user together with their password hash, by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a document cannot be read.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };
        let records: Vec<CredentialRecord> = self.store.get_or_default(keys::CREDENTIALS).await?;
        Ok(records
            .into_iter()
            .find(|r| r.user_id == user.id)
            .map(|r| (user, r.password_hash)))
    }

    /// Apply a validated profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist and
    /// `RepositoryError::Conflict` if the new username is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        self.store
            .update(keys::USERS, |users: &mut Vec<User>| {
                if let Some(username) = &update.username {
                    let wanted = normalize_username(username);
                    if users.iter().any(|u| u.id != id && u.username == wanted) {
                        return Err(RepositoryError::Conflict(
                            "username already exists".to_owned(),
                        ));
                    }
                }
                let user = users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                user.apply(update);
                Ok(user.clone())
            })
            .await
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<User, RepositoryError> {
        self.modify(id, |user| user.active = active).await
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<User, RepositoryError> {
        self.modify(id, |user| user.role = role).await
    }

    async fn modify<F>(&self, id: UserId, f: F) -> Result<User, RepositoryError>
    where
        F: FnOnce(&mut User) + Send,
    {
        self.store
            .update(keys::USERS, |users: &mut Vec<User>| {
                let user = users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                f(user);
                Ok(user.clone())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            name: "Asha Rao".to_owned(),
            username: username.to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "$argon2id$fake".to_owned(),
            role: UserRole::Reader,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = Store::memory();
        let repo = UserRepository::new(&store);
        let user = repo.create(new_user("Asha_R", "asha@katha.dev")).await.unwrap();
        assert_eq!(user.id, UserId::new(1));
        assert_eq!(user.username, "asha_r");
        assert!(user.active);

        let email = Email::parse("ASHA@katha.dev").unwrap();
        let (found, hash) = repo.get_password_hash(&email).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "$argon2id$fake");
        assert!(repo.get_by_username("ASHA_R").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_conflict() {
        let store = Store::memory();
        let repo = UserRepository::new(&store);
        repo.create(new_user("asha", "asha@katha.dev")).await.unwrap();
        let err = repo.create(new_user("other", "asha@katha.dev")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        let err = repo.create(new_user("asha", "other@katha.dev")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_username() {
        let store = Store::memory();
        let repo = UserRepository::new(&store);
        let a = repo.create(new_user("asha", "asha@katha.dev")).await.unwrap();
        repo.create(new_user("vik", "vik@katha.dev")).await.unwrap();

        let taken = ProfileUpdate {
            username: Some("VIK".to_owned()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            repo.update_profile(a.id, taken).await,
            Err(RepositoryError::Conflict(_))
        ));

        let rename = ProfileUpdate {
            name: Some("Asha R".to_owned()),
            username: Some("asha".to_owned()),
            ..ProfileUpdate::default()
        };
        assert_eq!(repo.update_profile(a.id, rename).await.unwrap().name, "Asha R");
    }

    #[tokio::test]
    async fn test_set_active_and_role() {
        let store = Store::memory();
        let repo = UserRepository::new(&store);
        let user = repo.create(new_user("asha", "asha@katha.dev")).await.unwrap();
        assert!(!repo.set_active(user.id, false).await.unwrap().active);
        assert!(repo.set_role(user.id, UserRole::Admin).await.unwrap().is_admin());
        assert!(matches!(
            repo.set_active(UserId::new(42), true).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
