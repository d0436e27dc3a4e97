use sqlx::PgPool;

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_init_schema",
    include_str!("../../sql/001_init_schema.sql"),
)];

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "_migrations" (
            "id" SERIAL PRIMARY KEY,
            "name" TEXT NOT NULL UNIQUE,
            "applied_at" TIMESTAMP NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(MigrationError::Sqlx)?;

    let applied: Vec<String> =
        sqlx::query_scalar(r#"SELECT "name" FROM "_migrations" ORDER BY "id""#)
            .fetch_all(pool)
            .await
            .map_err(MigrationError::Sqlx)?;

    let mut applied_count = 0;

    for &(name, sql) in MIGRATIONS {
        if applied.iter().any(|done| done == name) {
            tracing::debug!(migration = name, "Already applied, skipping");
            continue;
        }

        tracing::info!(migration = name, "Applying migration...");

        let mut tx = pool.begin().await.map_err(MigrationError::Sqlx)?;

        sqlx::raw_sql(sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Migration {
                name: name.to_string(),
                source: e,
            })?;

        sqlx::query(r#"INSERT INTO "_migrations" ("name") VALUES ($1)"#)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(MigrationError::Sqlx)?;

        tx.commit().await.map_err(MigrationError::Sqlx)?;

        applied_count += 1;
        tracing::info!(migration = name, "Migration applied successfully");
    }

    if applied_count > 0 {
        tracing::info!(count = applied_count, "Database migrations completed");
    } else {
        tracing::info!("Database is up to date, no migrations needed");
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Migration '{name}' failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
