//! Chapter comment threads, one document per chapter.

use katha_vault_core::{ChapterId, Comment, NovelId};

use super::{RepositoryError, Store, keys};

/// A chapter thread with its location.
#[derive(Debug, Clone)]
pub struct ChapterThread {
    pub novel_id: NovelId,
    pub chapter_id: ChapterId,
    pub comments: Vec<Comment>,
}

/// Repository for chapter comment trees.
pub struct ChapterCommentRepository<'a> {
    store: &'a Store,
}

impl<'a> ChapterCommentRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// The thread of one chapter (empty if nobody has commented).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the document cannot be read.
    pub async fn thread(
        &self,
        novel: NovelId,
        chapter: ChapterId,
    ) -> Result<Vec<Comment>, RepositoryError> {
        self.store
            .get_or_default(&keys::chapter_comments(novel, chapter))
            .await
    }

    /// Mutate one chapter's thread under its document lock.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a store error converted into `E`.
    pub async fn modify<R, E, F>(&self, novel: NovelId, chapter: ChapterId, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Vec<Comment>) -> Result<R, E> + Send,
        E: From<RepositoryError>,
    {
        self.store
            .update(&keys::chapter_comments(novel, chapter), f)
            .await
    }

    /// Drop the thread of a deleted chapter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    pub async fn delete_chapter(
        &self,
        novel: NovelId,
        chapter: ChapterId,
    ) -> Result<bool, RepositoryError> {
        self.store
            .delete(&keys::chapter_comments(novel, chapter))
            .await
    }

    /// Every chapter thread in the store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a document cannot be read.
    pub async fn all(&self) -> Result<Vec<ChapterThread>, RepositoryError> {
        let docs: Vec<(String, Vec<Comment>)> =
            self.store.scan(keys::CHAPTER_COMMENTS_PREFIX).await?;
        Ok(docs
            .into_iter()
            .filter_map(|(key, comments)| {
                let (novel_id, chapter_id) = keys::parse_chapter_comments(&key)?;
                Some(ChapterThread {
                    novel_id,
                    chapter_id,
                    comments,
                })
            })
            .collect())
    }
}
