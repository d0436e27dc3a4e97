//! Store double that replays lost races against a [`MemoryStore`].

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use super::memory::MemoryStore;
use super::{PrimaryStore, RenameOutcome, StoreError};
use crate::models::{Category, Link, Word, WordKey};

/// Delegates to an inner [`MemoryStore`], except that existence checks can
/// be blinded and translation swaps can be made to fail a number of times.
#[derive(Default)]
pub(crate) struct RacingStore {
    pub inner: MemoryStore,
    blind_lookups: AtomicBool,
    failing_swaps: AtomicUsize,
    swap_calls: AtomicUsize,
}

impl RacingStore {
    /// `find_*` report nothing, as if a concurrent writer had not committed
    /// yet when the caller checked.
    pub fn blind_lookups(&self) {
        self.blind_lookups.store(true, Ordering::Relaxed);
    }

    /// The next `count` swaps lose as if another writer got there first.
    pub fn fail_swaps(&self, count: usize) {
        self.failing_swaps.store(count, Ordering::Relaxed);
    }

    pub fn swap_calls(&self) -> usize {
        self.swap_calls.load(Ordering::Relaxed)
    }

    fn blind(&self) -> bool {
        self.blind_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PrimaryStore for RacingStore {
    fn backend(&self) -> &'static str {
        "racing"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn list_categories(&self, user: &str) -> Result<Vec<Category>, StoreError> {
        self.inner.list_categories(user).await
    }

    async fn find_category(&self, user: &str, title: &str) -> Result<Option<Category>, StoreError> {
        if self.blind() {
            return Ok(None);
        }
        self.inner.find_category(user, title).await
    }

    async fn insert_category(&self, category: &Category) -> Result<bool, StoreError> {
        self.inner.insert_category(category).await
    }

    async fn rename_category(
        &self,
        user: &str,
        title: &str,
        new_title: &str,
    ) -> Result<RenameOutcome, StoreError> {
        self.inner.rename_category(user, title, new_title).await
    }

    async fn set_category_image(
        &self,
        user: &str,
        title: &str,
        image: Option<&Link>,
    ) -> Result<Option<Category>, StoreError> {
        self.inner.set_category_image(user, title, image).await
    }

    async fn delete_category(&self, user: &str, title: &str) -> Result<bool, StoreError> {
        self.inner.delete_category(user, title).await
    }

    async fn list_words(&self, user: &str, category: Uuid) -> Result<Vec<Word>, StoreError> {
        self.inner.list_words(user, category).await
    }

    async fn find_word(&self, key: WordKey<'_>) -> Result<Option<Word>, StoreError> {
        if self.blind() {
            return Ok(None);
        }
        self.inner.find_word(key).await
    }

    async fn insert_word(&self, word: &Word) -> Result<bool, StoreError> {
        self.inner.insert_word(word).await
    }

    async fn set_word_image(
        &self,
        key: WordKey<'_>,
        image: Option<&Link>,
    ) -> Result<Option<Word>, StoreError> {
        self.inner.set_word_image(key, image).await
    }

    async fn swap_translations(
        &self,
        key: WordKey<'_>,
        expected: &BTreeSet<String>,
        next: &BTreeSet<String>,
    ) -> Result<bool, StoreError> {
        self.swap_calls.fetch_add(1, Ordering::Relaxed);
        let lost = self
            .failing_swaps
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_ok();
        if lost {
            return Ok(false);
        }
        self.inner.swap_translations(key, expected, next).await
    }

    async fn delete_word(&self, key: WordKey<'_>) -> Result<bool, StoreError> {
        self.inner.delete_word(key).await
    }

    async fn delete_words(&self, user: &str, category: Uuid) -> Result<u64, StoreError> {
        self.inner.delete_words(user, category).await
    }
}
