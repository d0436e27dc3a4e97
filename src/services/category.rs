use bytes::Bytes;

use crate::db::{RenameOutcome, SharedStore, StoreError};
use crate::models::{Category, MediaKind};
use crate::services::dictionary::remove_word_media;
use crate::services::media::{MediaError, MediaLibrary};

pub const INVALID_PARAMETERS: &str = "Parameters isn't specified correctly";
pub const ALREADY_EXISTS: &str = "Category already exists";
pub const RENAME_TARGET_EXISTS: &str = "Can't update, as new category already exist";
pub const NOT_FOUND: &str = "Category doesn't exist";
pub const EMPTY_IMAGE: &str = "image couldn't be empty";

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Clone)]
pub struct CategoryService {
    store: SharedStore,
    media: MediaLibrary,
}

impl CategoryService {
    pub fn new(store: SharedStore, media: MediaLibrary) -> Self {
        Self { store, media }
    }

    pub async fn list_by_user(&self, user: &str) -> Result<Vec<Category>, CategoryError> {
        Ok(self.store.list_categories(user).await?)
    }

    pub async fn create(
        &self,
        user: &str,
        title: &str,
        image: Option<Bytes>,
    ) -> Result<Category, CategoryError> {
        if title.trim().is_empty() {
            return Err(CategoryError::Validation(INVALID_PARAMETERS));
        }
        if self.store.find_category(user, title).await?.is_some() {
            return Err(CategoryError::Conflict(ALREADY_EXISTS));
        }

        let image = match image.filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => Some(self.media.store(MediaKind::Image, user, title, bytes).await?),
            None => None,
        };
        let category = Category::new(user, title, image);

        if !self.store.insert_category(&category).await? {
            if let Some(link) = &category.image {
                self.media.discard(MediaKind::Image, link).await;
            }
            tracing::info!(user, title, "category insert lost a concurrent create");
            return Err(CategoryError::Conflict(ALREADY_EXISTS));
        }

        tracing::info!(user, title, id = %category.id, "category created");
        Ok(category)
    }

    pub async fn rename(
        &self,
        user: &str,
        title: &str,
        new_title: &str,
    ) -> Result<Category, CategoryError> {
        if new_title.trim().is_empty() {
            return Err(CategoryError::Validation(INVALID_PARAMETERS));
        }

        match self.store.rename_category(user, title, new_title).await? {
            RenameOutcome::Renamed(category) => {
                tracing::info!(user, from = title, to = new_title, "category renamed");
                Ok(category)
            }
            RenameOutcome::Missing => Err(CategoryError::NotFound(NOT_FOUND)),
            RenameOutcome::Taken => Err(CategoryError::Conflict(RENAME_TARGET_EXISTS)),
        }
    }

    /// Swaps the cover image. The old blob goes first, so a failure while
    /// storing the new one leaves the category without an image blob.
    pub async fn replace_image(
        &self,
        user: &str,
        title: &str,
        image: Option<Bytes>,
    ) -> Result<Category, CategoryError> {
        let category = self
            .store
            .find_category(user, title)
            .await?
            .ok_or(CategoryError::NotFound(NOT_FOUND))?;
        let bytes = image
            .filter(|bytes| !bytes.is_empty())
            .ok_or(CategoryError::Validation(EMPTY_IMAGE))?;

        if let Some(old) = &category.image {
            self.media.remove(MediaKind::Image, old).await?;
        }
        let link = self.media.store(MediaKind::Image, user, title, bytes).await?;

        match self.store.set_category_image(user, title, Some(&link)).await? {
            Some(updated) => Ok(updated),
            None => {
                self.media.discard(MediaKind::Image, &link).await;
                Err(CategoryError::NotFound(NOT_FOUND))
            }
        }
    }

    /// Deletes the category together with its words and every blob they own.
    pub async fn delete(&self, user: &str, title: &str) -> Result<(), CategoryError> {
        let category = self
            .store
            .find_category(user, title)
            .await?
            .ok_or(CategoryError::NotFound(NOT_FOUND))?;

        if let Some(image) = &category.image {
            self.media.remove(MediaKind::Image, image).await?;
        }

        let words = self.store.list_words(user, category.id).await?;
        if !words.is_empty() {
            let blobs = remove_word_media(&self.media, &words).await?;
            let rows = self.store.delete_words(user, category.id).await?;
            tracing::info!(user, title, rows, blobs, "category words purged");
        }

        self.store.delete_category(user, title).await?;
        tracing::info!(user, title, "category deleted");
        Ok(())
    }
}
