use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Practice counter value from which a word counts as learned.
pub const LEARNED_THRESHOLD: u32 = 100;

/// Category ids travel as path segments and JSON strings; anything that is
/// not a UUID is rejected before the store is consulted.
pub fn parse_category_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Blob reference: the storage key plus the public URL derived from it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub user: String,
    pub title: String,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Link>,
}

impl Category {
    pub fn new(user: impl Into<String>, title: impl Into<String>, image: Option<Link>) -> Self {
        Self {
            user: user.into(),
            title: title.into(),
            id: Uuid::new_v4(),
            image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Example {
    #[serde(rename = "word")]
    pub headword: String,
    #[serde(default)]
    pub definitions: BTreeSet<String>,
    #[serde(default)]
    pub sentences: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub user: String,
    pub category: Uuid,
    pub word: String,
    #[serde(default)]
    pub answers: u32,
    #[serde(default)]
    pub translation: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech: Option<Link>,
    #[serde(default)]
    pub examples: BTreeSet<Example>,
}

impl Word {
    pub fn new(
        user: impl Into<String>,
        category: Uuid,
        word: impl Into<String>,
        translation: BTreeSet<String>,
    ) -> Self {
        Self {
            user: user.into(),
            category,
            word: word.into(),
            answers: 0,
            translation,
            image: None,
            speech: None,
            examples: BTreeSet::new(),
        }
    }

    pub fn learned(&self) -> bool {
        self.answers >= LEARNED_THRESHOLD
    }

    pub fn key(&self) -> WordKey<'_> {
        WordKey {
            user: &self.user,
            category: self.category,
            word: &self.word,
        }
    }

    /// Blobs owned by this row, tagged with the bucket each one lives in.
    pub fn media(&self) -> impl Iterator<Item = (MediaKind, &Link)> {
        self.image
            .iter()
            .map(|link| (MediaKind::Image, link))
            .chain(self.speech.iter().map(|link| (MediaKind::Speech, link)))
    }
}

/// Borrowed identity of a word row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordKey<'a> {
    pub user: &'a str,
    pub category: Uuid,
    pub word: &'a str,
}

impl<'a> WordKey<'a> {
    pub fn new(user: &'a str, category: Uuid, word: &'a str) -> Self {
        Self { user, category, word }
    }
}

/// Which bucket a blob lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Speech,
}
