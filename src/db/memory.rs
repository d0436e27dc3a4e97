use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{PrimaryStore, RenameOutcome, StoreError};
use crate::models::{Category, Link, Word, WordKey};

type CategoryKey = (String, String);
type WordRowKey = (String, Uuid, String);

/// Process-local primary store. Each operation runs inside one lock
/// acquisition, so the conditional writes are atomic with respect to each
/// other.
#[derive(Default)]
pub struct MemoryStore {
    categories: RwLock<BTreeMap<CategoryKey, Category>>,
    words: RwLock<BTreeMap<WordRowKey, Word>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category_count(&self) -> usize {
        self.categories.read().len()
    }

    pub fn word_count(&self) -> usize {
        self.words.read().len()
    }
}

fn row_key(key: WordKey<'_>) -> WordRowKey {
    (key.user.to_string(), key.category, key.word.to_string())
}

#[async_trait]
impl PrimaryStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_categories(&self, user: &str) -> Result<Vec<Category>, StoreError> {
        let guard = self.categories.read();
        Ok(guard
            .values()
            .filter(|category| category.user == user)
            .cloned()
            .collect())
    }

    async fn find_category(&self, user: &str, title: &str) -> Result<Option<Category>, StoreError> {
        let guard = self.categories.read();
        Ok(guard.get(&(user.to_string(), title.to_string())).cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<bool, StoreError> {
        let mut guard = self.categories.write();
        let key = (category.user.clone(), category.title.clone());
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, category.clone());
        Ok(true)
    }

    async fn rename_category(
        &self,
        user: &str,
        title: &str,
        new_title: &str,
    ) -> Result<RenameOutcome, StoreError> {
        let mut guard = self.categories.write();
        let old_key = (user.to_string(), title.to_string());
        let new_key = (user.to_string(), new_title.to_string());

        if !guard.contains_key(&old_key) {
            return Ok(RenameOutcome::Missing);
        }
        if title == new_title {
            return Ok(RenameOutcome::Renamed(guard[&old_key].clone()));
        }
        if guard.contains_key(&new_key) {
            return Ok(RenameOutcome::Taken);
        }

        let Some(mut category) = guard.remove(&old_key) else {
            return Ok(RenameOutcome::Missing);
        };
        category.title = new_title.to_string();
        guard.insert(new_key, category.clone());
        Ok(RenameOutcome::Renamed(category))
    }

    async fn set_category_image(
        &self,
        user: &str,
        title: &str,
        image: Option<&Link>,
    ) -> Result<Option<Category>, StoreError> {
        let mut guard = self.categories.write();
        Ok(guard
            .get_mut(&(user.to_string(), title.to_string()))
            .map(|category| {
                category.image = image.cloned();
                category.clone()
            }))
    }

    async fn delete_category(&self, user: &str, title: &str) -> Result<bool, StoreError> {
        let mut guard = self.categories.write();
        Ok(guard.remove(&(user.to_string(), title.to_string())).is_some())
    }

    async fn list_words(&self, user: &str, category: Uuid) -> Result<Vec<Word>, StoreError> {
        let guard = self.words.read();
        Ok(guard
            .values()
            .filter(|word| word.user == user && word.category == category)
            .cloned()
            .collect())
    }

    async fn find_word(&self, key: WordKey<'_>) -> Result<Option<Word>, StoreError> {
        let guard = self.words.read();
        Ok(guard.get(&row_key(key)).cloned())
    }

    async fn insert_word(&self, word: &Word) -> Result<bool, StoreError> {
        let mut guard = self.words.write();
        let key = row_key(word.key());
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, word.clone());
        Ok(true)
    }

    async fn set_word_image(
        &self,
        key: WordKey<'_>,
        image: Option<&Link>,
    ) -> Result<Option<Word>, StoreError> {
        let mut guard = self.words.write();
        Ok(guard.get_mut(&row_key(key)).map(|word| {
            word.image = image.cloned();
            word.clone()
        }))
    }

    async fn swap_translations(
        &self,
        key: WordKey<'_>,
        expected: &BTreeSet<String>,
        next: &BTreeSet<String>,
    ) -> Result<bool, StoreError> {
        let mut guard = self.words.write();
        match guard.get_mut(&row_key(key)) {
            Some(word) if &word.translation == expected => {
                word.translation = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_word(&self, key: WordKey<'_>) -> Result<bool, StoreError> {
        let mut guard = self.words.write();
        Ok(guard.remove(&row_key(key)).is_some())
    }

    async fn delete_words(&self, user: &str, category: Uuid) -> Result<u64, StoreError> {
        let mut guard = self.words.write();
        let before = guard.len();
        guard.retain(|(row_user, row_category, _), _| {
            !(row_user == user && *row_category == category)
        });
        Ok((before - guard.len()) as u64)
    }
}
