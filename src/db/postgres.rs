use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::config::DbConfig;
use super::migrate::run_migrations;
use super::{PrimaryStore, RenameOutcome, StoreError};
use crate::models::{Category, Example, Link, Word, WordKey};

const CATEGORY_COLUMNS: &str = r#""user", "title", "id", "image""#;
const WORD_COLUMNS: &str =
    r#""user", "category", "word", "answers", "translation", "image", "speech", "examples""#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, config: &DbConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(url)
            .await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }
}

fn map_category(row: &PgRow) -> Result<Category, StoreError> {
    let image: Option<Json<Link>> = row.try_get("image")?;
    Ok(Category {
        user: row.try_get("user")?,
        title: row.try_get("title")?,
        id: row.try_get("id")?,
        image: image.map(|json| json.0),
    })
}

fn map_word(row: &PgRow) -> Result<Word, StoreError> {
    let answers: i32 = row.try_get("answers")?;
    let translation: Vec<String> = row.try_get("translation")?;
    let image: Option<Json<Link>> = row.try_get("image")?;
    let speech: Option<Json<Link>> = row.try_get("speech")?;
    let examples: Json<BTreeSet<Example>> = row.try_get("examples")?;

    Ok(Word {
        user: row.try_get("user")?,
        category: row.try_get("category")?,
        word: row.try_get("word")?,
        answers: u32::try_from(answers)
            .map_err(|_| StoreError::Decode(format!("negative answers counter: {answers}")))?,
        translation: translation.into_iter().collect(),
        image: image.map(|json| json.0),
        speech: speech.map(|json| json.0),
        examples: examples.0,
    })
}

fn as_array(set: &BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

#[async_trait]
impl PrimaryStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_categories(&self, user: &str) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CATEGORY_COLUMNS} FROM "categories"
            WHERE "user" = $1
            ORDER BY "title" COLLATE "C"
            "#
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_category).collect()
    }

    async fn find_category(&self, user: &str, title: &str) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query(&format!(
            r#"SELECT {CATEGORY_COLUMNS} FROM "categories" WHERE "user" = $1 AND "title" = $2"#
        ))
        .bind(user)
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_category).transpose()
    }

    async fn insert_category(&self, category: &Category) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO "categories" ("user", "title", "id", "image")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ("user", "title") DO NOTHING
            "#,
        )
        .bind(&category.user)
        .bind(&category.title)
        .bind(category.id)
        .bind(category.image.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn rename_category(
        &self,
        user: &str,
        title: &str,
        new_title: &str,
    ) -> Result<RenameOutcome, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE "categories" SET "title" = $3
            WHERE "user" = $1 AND "title" = $2
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(user)
        .bind(title)
        .bind(new_title)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some(row)) => Ok(RenameOutcome::Renamed(map_category(&row)?)),
            Ok(None) => Ok(RenameOutcome::Missing),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Ok(RenameOutcome::Taken)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set_category_image(
        &self,
        user: &str,
        title: &str,
        image: Option<&Link>,
    ) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE "categories" SET "image" = $3
            WHERE "user" = $1 AND "title" = $2
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(user)
        .bind(title)
        .bind(image.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_category).transpose()
    }

    async fn delete_category(&self, user: &str, title: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM "categories" WHERE "user" = $1 AND "title" = $2"#)
            .bind(user)
            .bind(title)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_words(&self, user: &str, category: Uuid) -> Result<Vec<Word>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {WORD_COLUMNS} FROM "words"
            WHERE "user" = $1 AND "category" = $2
            ORDER BY "word" COLLATE "C"
            "#
        ))
        .bind(user)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_word).collect()
    }

    async fn find_word(&self, key: WordKey<'_>) -> Result<Option<Word>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {WORD_COLUMNS} FROM "words"
            WHERE "user" = $1 AND "category" = $2 AND "word" = $3
            "#
        ))
        .bind(key.user)
        .bind(key.category)
        .bind(key.word)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_word).transpose()
    }

    async fn insert_word(&self, word: &Word) -> Result<bool, StoreError> {
        let answers = i32::try_from(word.answers).unwrap_or(i32::MAX);
        let result = sqlx::query(
            r#"
            INSERT INTO "words"
                ("user", "category", "word", "answers",
                 "translation", "image", "speech", "examples")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT ("user", "category", "word") DO NOTHING
            "#,
        )
        .bind(&word.user)
        .bind(word.category)
        .bind(&word.word)
        .bind(answers)
        .bind(as_array(&word.translation))
        .bind(word.image.as_ref().map(Json))
        .bind(word.speech.as_ref().map(Json))
        .bind(Json(&word.examples))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_word_image(
        &self,
        key: WordKey<'_>,
        image: Option<&Link>,
    ) -> Result<Option<Word>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE "words" SET "image" = $4
            WHERE "user" = $1 AND "category" = $2 AND "word" = $3
            RETURNING {WORD_COLUMNS}
            "#
        ))
        .bind(key.user)
        .bind(key.category)
        .bind(key.word)
        .bind(image.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_word).transpose()
    }

    async fn swap_translations(
        &self,
        key: WordKey<'_>,
        expected: &BTreeSet<String>,
        next: &BTreeSet<String>,
    ) -> Result<bool, StoreError> {
        // Set equality: order and duplicates in the stored array are ignored.
        let result = sqlx::query(
            r#"
            UPDATE "words" SET "translation" = $5
            WHERE "user" = $1 AND "category" = $2 AND "word" = $3
              AND "translation" @> $4 AND "translation" <@ $4
            "#,
        )
        .bind(key.user)
        .bind(key.category)
        .bind(key.word)
        .bind(as_array(expected))
        .bind(as_array(next))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_word(&self, key: WordKey<'_>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"DELETE FROM "words" WHERE "user" = $1 AND "category" = $2 AND "word" = $3"#,
        )
        .bind(key.user)
        .bind(key.category)
        .bind(key.word)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_words(&self, user: &str, category: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(r#"DELETE FROM "words" WHERE "user" = $1 AND "category" = $2"#)
            .bind(user)
            .bind(category)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
