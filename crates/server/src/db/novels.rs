//! Novel repository: the `novels` document and the chapter threads that
//! belong to each novel.

use katha_vault_core::novel::NovelDraft;
use katha_vault_core::types::next_id;
use katha_vault_core::{Novel, NovelId, UserId};

use super::{RepositoryError, Store, keys};

/// Repository for novels and their chapters.
pub struct NovelRepository<'a> {
    store: &'a Store,
}

impl<'a> NovelRepository<'a> {
    /// Create a new novel repository.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Every novel, drafts included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn list(&self) -> Result<Vec<Novel>, RepositoryError> {
        self.store.get_or_default(keys::NOVELS).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn get(&self, id: NovelId) -> Result<Option<Novel>, RepositoryError> {
        Ok(self.list().await?.into_iter().find(|n| n.id == id))
    }

    /// Store a new draft novel under a fresh id.
    ///
    /// Ids come from the `novel_seq` high-water mark and are never reused,
    /// even after the newest novel is deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a document cannot be written.
    pub async fn create(
        &self,
        author_id: UserId,
        author: &str,
        draft: NovelDraft,
    ) -> Result<Novel, RepositoryError> {
        let id = self.reserve_id().await?;
        self.store
            .update(keys::NOVELS, |novels: &mut Vec<Novel>| {
                if novels.iter().any(|n| n.id == id) {
                    return Err(RepositoryError::Conflict(format!("novel {id} already exists")));
                }
                let novel = Novel::create(id, author_id, author, draft);
                novels.push(novel.clone());
                Ok(novel)
            })
            .await
    }

    /// Advance the id sequence past both its last value and every stored
    /// novel (seeded or older data may predate the sequence).
    async fn reserve_id(&self) -> Result<NovelId, RepositoryError> {
        let existing = self.list().await?;
        self.store
            .update(keys::NOVEL_SEQ, |last: &mut Option<NovelId>| {
                let id = next_id(last.iter().copied().chain(existing.iter().map(|n| n.id)));
                *last = Some(id);
                Ok(id)
            })
            .await
    }

    /// Mutate one novel under the document lock.
    ///
    /// Nothing is written when `f` fails.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (converted into `E`) if the novel
    /// does not exist, or whatever `f` returns.
    pub async fn modify<R, E, F>(&self, id: NovelId, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Novel) -> Result<R, E> + Send,
        E: From<RepositoryError>,
    {
        self.store
            .update(keys::NOVELS, |novels: &mut Vec<Novel>| {
                let novel = novels
                    .iter_mut()
                    .find(|n| n.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                f(novel)
            })
            .await
    }

    /// Remove a novel after `check` approves it, together with every comment
    /// thread on its chapters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (converted into `E`) if the novel
    /// does not exist, or the error from `check`.
    pub async fn delete<E, F>(&self, id: NovelId, check: F) -> Result<Novel, E>
    where
        F: FnOnce(&Novel) -> Result<(), E> + Send,
        E: From<RepositoryError>,
    {
        let removed = self
            .store
            .update(keys::NOVELS, |novels: &mut Vec<Novel>| {
                let pos = novels
                    .iter()
                    .position(|n| n.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                if let Some(novel) = novels.get(pos) {
                    check(novel)?;
                }
                Ok::<_, E>(novels.remove(pos))
            })
            .await?;

        let threads = self
            .store
            .delete_prefix(&keys::novel_comments_prefix(id))
            .await?;
        tracing::debug!(novel_id = %id, threads, "Deleted chapter comment threads");
        Ok(removed)
    }

    /// Update the denormalized author name on every novel by `author_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn rename_author(&self, author_id: UserId, name: &str) -> Result<(), RepositoryError> {
        self.store
            .update(keys::NOVELS, |novels: &mut Vec<Novel>| {
                novels
                    .iter_mut()
                    .filter(|n| n.author_id == author_id)
                    .for_each(|n| n.author = name.to_owned());
                Ok(())
            })
            .await
    }

    /// Replace the whole collection (used by seeding).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be written.
    pub async fn replace_all(&self, novels: &[Novel]) -> Result<(), RepositoryError> {
        self.store.put(keys::NOVELS, &novels).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use katha_vault_core::comment;
    use katha_vault_core::novel::ChapterDraft;
    use katha_vault_core::{ChapterId, Comment};

    fn draft(title: &str) -> NovelDraft {
        NovelDraft {
            title: title.to_owned(),
            genres: vec!["Fantasy".to_owned()],
            synopsis: "A story about rivers and kings.".to_owned(),
            featured_genre: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = Store::memory();
        let repo = NovelRepository::new(&store);
        let a = repo.create(UserId::new(1), "Mira", draft("First")).await.unwrap();
        let b = repo.create(UserId::new(1), "Mira", draft("Second")).await.unwrap();
        assert_eq!(a.id, NovelId::new(1));
        assert_eq!(b.id, NovelId::new(2));
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deleted_ids_are_not_reused() {
        let store = Store::memory();
        let repo = NovelRepository::new(&store);
        let first = repo.create(UserId::new(1), "Mira", draft("First")).await.unwrap();
        let second = repo.create(UserId::new(1), "Mira", draft("Second")).await.unwrap();
        let removed: Result<Novel, RepositoryError> = repo.delete(second.id, |_| Ok(())).await;
        removed.unwrap();

        let third = repo.create(UserId::new(1), "Mira", draft("Third")).await.unwrap();
        assert_eq!(first.id, NovelId::new(1));
        assert_eq!(third.id, NovelId::new(3));
    }

    #[tokio::test]
    async fn test_sequence_starts_past_existing_novels() {
        let store = Store::memory();
        let repo = NovelRepository::new(&store);
        let seeded = Novel::create(NovelId::new(7), UserId::new(1), "Mira", draft("Seeded"));
        repo.replace_all(&[seeded]).await.unwrap();

        let novel = repo.create(UserId::new(1), "Mira", draft("Fresh")).await.unwrap();
        assert_eq!(novel.id, NovelId::new(8));
    }

    #[tokio::test]
    async fn test_modify_missing_novel_is_not_found() {
        let store = Store::memory();
        let repo = NovelRepository::new(&store);
        let result: Result<(), RepositoryError> = repo.modify(NovelId::new(9), |_| Ok(())).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_removes_chapter_threads() {
        let store = Store::memory();
        let repo = NovelRepository::new(&store);
        let novel = repo.create(UserId::new(1), "Mira", draft("Doomed")).await.unwrap();
        let keep = repo.create(UserId::new(1), "Mira", draft("Kept")).await.unwrap();
        let chapter: Result<ChapterId, RepositoryError> = repo
            .modify(novel.id, |n| {
                Ok(n.push_chapter(ChapterDraft {
                    title: "One".to_owned(),
                    content: "Twenty characters at least.".to_owned(),
                }))
            })
            .await;
        let chapter = chapter.unwrap();

        let mut thread = Vec::new();
        comment::insert(&mut thread, None, UserId::new(2), "Reader", "Nice").unwrap();
        store.put(&keys::chapter_comments(novel.id, chapter), &thread).await.unwrap();
        store.put(&keys::chapter_comments(keep.id, chapter), &thread).await.unwrap();

        let removed: Result<Novel, RepositoryError> = repo.delete(novel.id, |_| Ok(())).await;
        assert_eq!(removed.unwrap().title, "Doomed");
        assert!(repo.get(novel.id).await.unwrap().is_none());
        assert!(store
            .get::<Vec<Comment>>(&keys::chapter_comments(novel.id, chapter))
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get::<Vec<Comment>>(&keys::chapter_comments(keep.id, chapter))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_rejected_by_check_keeps_novel() {
        let store = Store::memory();
        let repo = NovelRepository::new(&store);
        let novel = repo.create(UserId::new(1), "Mira", draft("Mine")).await.unwrap();
        let result: Result<Novel, RepositoryError> = repo
            .delete(novel.id, |_| Err(RepositoryError::Conflict("not yours".to_owned())))
            .await;
        assert!(result.is_err());
        assert!(repo.get(novel.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_author() {
        let store = Store::memory();
        let repo = NovelRepository::new(&store);
        repo.create(UserId::new(1), "Mira", draft("A")).await.unwrap();
        repo.create(UserId::new(2), "Other", draft("B")).await.unwrap();
        repo.rename_author(UserId::new(1), "Mira K").await.unwrap();
        let novels = repo.list().await.unwrap();
        assert_eq!(novels[0].author, "Mira K");
        assert_eq!(novels[1].author, "Other");
    }
}
