use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{SharedStore, StoreError};
use crate::models::{parse_category_id, Example, MediaKind, Word, WordKey};
use crate::services::examples::ExampleLookup;
use crate::services::media::{MediaError, MediaLibrary};
use crate::services::speech::{SpeechError, SpeechSynthesizer};

pub const INVALID_PARAMETERS: &str = "Parameters isn't specified correctly";
pub const ALREADY_EXISTS: &str = "Word already exists";
pub const NOT_FOUND: &str = "word doesn't exists";
pub const MISSING_IMAGE: &str = "Image wasn't found";
pub const EMPTY_TRANSLATION: &str = "translation couldn't be empty";
pub const MALFORMED_CATEGORY: &str = "Malformed category identifier";

/// Attempts of the optimistic translation update before giving up.
pub const MAX_SWAP_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum WordError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("translation update kept losing to concurrent writers")]
    Contention,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Speech(#[from] SpeechError),
}

/// Client-supplied fields of a word to create; everything is optional so
/// that missing fields surface as validation errors rather than decode
/// failures.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    pub category: Option<String>,
    pub word: Option<String>,
    pub translation: Option<BTreeSet<String>>,
}

impl NewWord {
    fn validate(self) -> Result<(Uuid, String, BTreeSet<String>), WordError> {
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .ok_or(WordError::Validation(INVALID_PARAMETERS))?;
        let category =
            parse_category_id(&category).ok_or(WordError::Validation(MALFORMED_CATEGORY))?;
        let word = self
            .word
            .filter(|w| !w.trim().is_empty())
            .ok_or(WordError::Validation(INVALID_PARAMETERS))?;
        let translation: BTreeSet<String> = self
            .translation
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        if translation.is_empty() {
            return Err(WordError::Validation(INVALID_PARAMETERS));
        }
        Ok((category, word, translation))
    }
}

#[derive(Clone)]
pub struct WordService {
    store: SharedStore,
    media: MediaLibrary,
    speech: Arc<dyn SpeechSynthesizer>,
    examples: Arc<dyn ExampleLookup>,
    voice: String,
}

impl WordService {
    pub fn new(
        store: SharedStore,
        media: MediaLibrary,
        speech: Arc<dyn SpeechSynthesizer>,
        examples: Arc<dyn ExampleLookup>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            store,
            media,
            speech,
            examples,
            voice: voice.into(),
        }
    }

    pub async fn list(
        &self,
        user: &str,
        category: Uuid,
        learned: Option<bool>,
    ) -> Result<Vec<Word>, WordError> {
        let mut words = self.store.list_words(user, category).await?;
        if let Some(learned) = learned {
            words.retain(|word| word.learned() == learned);
        }
        Ok(words)
    }

    /// Creates a word with synthesized speech and looked-up examples. Steps
    /// run in order: uniqueness check, speech, examples, image, row.
    pub async fn create(
        &self,
        user: &str,
        draft: NewWord,
        image: Option<Bytes>,
    ) -> Result<Word, WordError> {
        let (category, spelling, translation) = draft.validate()?;
        if self
            .store
            .find_word(WordKey::new(user, category, &spelling))
            .await?
            .is_some()
        {
            return Err(WordError::Conflict(ALREADY_EXISTS));
        }

        let audio = self.speech.synthesize(&spelling, &self.voice).await?;
        let speech = self.media.store(MediaKind::Speech, user, &spelling, audio).await?;

        let examples = self.lookup_examples(&spelling).await;

        let image = match image.filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => match self.media.store(MediaKind::Image, user, &spelling, bytes).await {
                Ok(link) => Some(link),
                Err(err) => {
                    self.media.discard(MediaKind::Speech, &speech).await;
                    return Err(err.into());
                }
            },
            None => None,
        };

        let mut word = Word::new(user, category, spelling, translation);
        word.speech = Some(speech);
        word.image = image;
        word.examples = examples;

        if !self.store.insert_word(&word).await? {
            for (kind, link) in word.media() {
                self.media.discard(kind, link).await;
            }
            tracing::info!(user, word = %word.word, "word insert lost a concurrent create");
            return Err(WordError::Conflict(ALREADY_EXISTS));
        }

        tracing::info!(user, category = %category, word = %word.word, "word created");
        Ok(word)
    }

    async fn lookup_examples(&self, word: &str) -> BTreeSet<Example> {
        match self.examples.lookup(word).await {
            Ok(examples) => examples,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    word,
                    "example lookup failed, continuing without examples"
                );
                BTreeSet::new()
            }
        }
    }

    /// Replaces the word's image. Speech is left untouched.
    pub async fn replace_image(
        &self,
        key: WordKey<'_>,
        image: Option<Bytes>,
    ) -> Result<Word, WordError> {
        let word = self
            .store
            .find_word(key)
            .await?
            .ok_or(WordError::NotFound(NOT_FOUND))?;
        let bytes = image
            .filter(|bytes| !bytes.is_empty())
            .ok_or(WordError::Validation(MISSING_IMAGE))?;

        if let Some(old) = &word.image {
            self.media.remove(MediaKind::Image, old).await?;
        }
        let link = self.media.store(MediaKind::Image, key.user, key.word, bytes).await?;

        match self.store.set_word_image(key, Some(&link)).await? {
            Some(updated) => Ok(updated),
            None => {
                self.media.discard(MediaKind::Image, &link).await;
                Err(WordError::NotFound(NOT_FOUND))
            }
        }
    }

    pub async fn add_translation(
        &self,
        key: WordKey<'_>,
        additions: &BTreeSet<String>,
    ) -> Result<Word, WordError> {
        self.update_translations(key, |current| Ok(current.union(additions).cloned().collect()))
            .await
    }

    /// Removes translations, refusing to leave a non-empty set empty.
    pub async fn remove_translation(
        &self,
        key: WordKey<'_>,
        removals: &BTreeSet<String>,
    ) -> Result<Word, WordError> {
        self.update_translations(key, |current| {
            let next: BTreeSet<String> = current.difference(removals).cloned().collect();
            if next.is_empty() && !current.is_empty() {
                return Err(WordError::Validation(EMPTY_TRANSLATION));
            }
            Ok(next)
        })
        .await
    }

    async fn update_translations<F>(&self, key: WordKey<'_>, apply: F) -> Result<Word, WordError>
    where
        F: Fn(&BTreeSet<String>) -> Result<BTreeSet<String>, WordError>,
    {
        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let mut word = self
                .store
                .find_word(key)
                .await?
                .ok_or(WordError::NotFound(NOT_FOUND))?;
            let next = apply(&word.translation)?;
            if next == word.translation {
                return Ok(word);
            }
            if self.store.swap_translations(key, &word.translation, &next).await? {
                word.translation = next;
                return Ok(word);
            }
            tracing::debug!(attempt, word = key.word, "translation swap lost a race, retrying");
        }

        tracing::warn!(
            user = key.user,
            word = key.word,
            "translation update gave up after retries"
        );
        Err(WordError::Contention)
    }

    pub async fn delete(&self, key: WordKey<'_>) -> Result<(), WordError> {
        let word = self
            .store
            .find_word(key)
            .await?
            .ok_or(WordError::NotFound(NOT_FOUND))?;

        remove_word_media(&self.media, std::slice::from_ref(&word)).await?;
        self.store.delete_word(key).await?;
        tracing::info!(user = key.user, word = key.word, "word deleted");
        Ok(())
    }

    pub async fn delete_category_words(&self, user: &str, category: Uuid) -> Result<(), WordError> {
        let words = self.store.list_words(user, category).await?;
        if words.is_empty() {
            return Err(WordError::NotFound(NOT_FOUND));
        }

        let blobs = remove_word_media(&self.media, &words).await?;
        let rows = self.store.delete_words(user, category).await?;
        tracing::info!(user, category = %category, rows, blobs, "category words deleted");
        Ok(())
    }
}

/// Deletes every image and speech blob owned by `words`, returning how many
/// were removed.
pub(crate) async fn remove_word_media(
    media: &MediaLibrary,
    words: &[Word],
) -> Result<usize, MediaError> {
    let removals = words
        .iter()
        .flat_map(Word::media)
        .map(|(kind, link)| media.remove(kind, link));
    let removed = try_join_all(removals).await?;
    Ok(removed.len())
}
