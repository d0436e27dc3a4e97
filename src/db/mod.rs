pub mod config;
pub mod memory;
pub mod migrate;
pub mod postgres;
#[cfg(test)]
pub(crate) mod racing;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::db::config::DbConfig;
use crate::db::memory::MemoryStore;
use crate::db::postgres::PgStore;
use crate::models::{Category, Link, Word, WordKey};

/// Result of an in-place category rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed(Category),
    Missing,
    Taken,
}

/// Typed access to the partitioned primary store.
///
/// Categories are partitioned by user and clustered by title; words are
/// partitioned by (user, category) and clustered by word. Every write that
/// guards an identity is conditional: inserts only succeed when the key is
/// free, renames only when the target title is free, and translation
/// updates only when the stored set still matches what the caller read.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn list_categories(&self, user: &str) -> Result<Vec<Category>, StoreError>;

    async fn find_category(&self, user: &str, title: &str) -> Result<Option<Category>, StoreError>;

    /// Returns `false` when (user, title) is already taken.
    async fn insert_category(&self, category: &Category) -> Result<bool, StoreError>;

    async fn rename_category(
        &self,
        user: &str,
        title: &str,
        new_title: &str,
    ) -> Result<RenameOutcome, StoreError>;

    async fn set_category_image(
        &self,
        user: &str,
        title: &str,
        image: Option<&Link>,
    ) -> Result<Option<Category>, StoreError>;

    async fn delete_category(&self, user: &str, title: &str) -> Result<bool, StoreError>;

    /// Words of one partition in clustering order.
    async fn list_words(&self, user: &str, category: Uuid) -> Result<Vec<Word>, StoreError>;

    async fn find_word(&self, key: WordKey<'_>) -> Result<Option<Word>, StoreError>;

    /// Returns `false` when (user, category, word) is already taken.
    async fn insert_word(&self, word: &Word) -> Result<bool, StoreError>;

    async fn set_word_image(
        &self,
        key: WordKey<'_>,
        image: Option<&Link>,
    ) -> Result<Option<Word>, StoreError>;

    /// Compare-and-swap on the translation set. Returns `false` if the row
    /// is gone or its set no longer equals `expected`.
    async fn swap_translations(
        &self,
        key: WordKey<'_>,
        expected: &BTreeSet<String>,
        next: &BTreeSet<String>,
    ) -> Result<bool, StoreError>;

    async fn delete_word(&self, key: WordKey<'_>) -> Result<bool, StoreError>;

    /// Drops a whole (user, category) partition, returning the row count.
    async fn delete_words(&self, user: &str, category: Uuid) -> Result<u64, StoreError>;
}

pub type SharedStore = Arc<dyn PrimaryStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] migrate::MigrationError),
    #[error("corrupt row: {0}")]
    Decode(String),
}

/// Connects to Postgres when `DATABASE_URL` is configured, otherwise falls
/// back to the process-local store.
pub async fn connect(config: &DbConfig) -> Result<SharedStore, StoreError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::connect(url, config).await?;
            tracing::info!(backend = store.backend(), "primary store connected");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory primary store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_without_url_uses_memory_store() {
        let store = connect(&DbConfig::default()).await.unwrap();
        assert_eq!(store.backend(), "memory");
        store.ping().await.unwrap();
    }
}
