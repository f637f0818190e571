//! Post repository: the single authoritative `posts` document.

use katha_vault_core::post::PostDraft;
use katha_vault_core::types::next_id;
use katha_vault_core::{Post, PostId, UserId};

use super::{RepositoryError, Store, keys};

/// Repository for feed posts and their comment threads.
pub struct PostRepository<'a> {
    store: &'a Store,
}

impl<'a> PostRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn list(&self) -> Result<Vec<Post>, RepositoryError> {
        self.store.get_or_default(keys::POSTS).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn create(
        &self,
        author_id: UserId,
        author: &str,
        draft: PostDraft,
    ) -> Result<Post, RepositoryError> {
        self.store
            .update(keys::POSTS, |posts: &mut Vec<Post>| {
                let id = next_id(posts.iter().map(|p| p.id));
                let post = Post::create(id, author_id, author, draft);
                posts.push(post.clone());
                Ok(post)
            })
            .await
    }

    /// Mutate one post (likes, comments) under the document lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (converted into `E`) if the post
    /// does not exist, or whatever `f` returns.
    pub async fn modify<R, E, F>(&self, id: PostId, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Post) -> Result<R, E> + Send,
        E: From<RepositoryError>,
    {
        self.store
            .update(keys::POSTS, |posts: &mut Vec<Post>| {
                let post = posts
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                f(post)
            })
            .await
    }

    /// Remove a post after `check` approves it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (converted into `E`) if the post
    /// does not exist, or the error from `check`.
    pub async fn delete<E, F>(&self, id: PostId, check: F) -> Result<Post, E>
    where
        F: FnOnce(&Post) -> Result<(), E> + Send,
        E: From<RepositoryError>,
    {
        self.store
            .update(keys::POSTS, |posts: &mut Vec<Post>| {
                let pos = posts
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                if let Some(post) = posts.get(pos) {
                    check(post)?;
                }
                Ok::<_, E>(posts.remove(pos))
            })
            .await
    }

    /// Update the denormalized author name on every post by `author_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn rename_author(&self, author_id: UserId, name: &str) -> Result<(), RepositoryError> {
        self.store
            .update(keys::POSTS, |posts: &mut Vec<Post>| {
                posts
                    .iter_mut()
                    .filter(|p| p.author_id == author_id)
                    .for_each(|p| p.author = name.to_owned());
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(content: &str) -> PostDraft {
        PostDraft {
            content: content.to_owned(),
            genre_tag: None,
        }
    }

    #[tokio::test]
    async fn test_create_like_and_delete() {
        let store = Store::memory();
        let repo = PostRepository::new(&store);
        let post = repo.create(UserId::new(1), "Asha", draft("Chapter 3 is up!")).await.unwrap();
        assert_eq!(post.id, PostId::new(1));

        let liked: Result<bool, RepositoryError> =
            repo.modify(post.id, |p| Ok(p.toggle_like(UserId::new(2)))).await;
        assert!(liked.unwrap());
        assert_eq!(repo.list().await.unwrap()[0].likes, 1);

        let deleted: Result<Post, RepositoryError> = repo.delete(post.id, |_| Ok(())).await;
        assert!(deleted.is_ok());
        assert!(repo.list().await.unwrap().is_empty());

        let missing: Result<Post, RepositoryError> = repo.delete(post.id, |_| Ok(())).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound)));
    }
}
