pub mod query;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;
use sqlx::SqlitePool;
use std::str::FromStr;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(sqlx::Error::Io)?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

async fn add_column_if_missing(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<(), sqlx::Error> {
    let pragma = format!("PRAGMA table_info({})", table);
    let rows = sqlx::query(&pragma).fetch_all(pool).await?;

    let exists = rows.iter().any(|row| {
        let name: String = row.get("name");
        name == column
    });

    if exists {
        return Ok(());
    }

    let alter = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl);
    sqlx::query(&alter).execute(pool).await?;
    Ok(())
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            fcm_token TEXT,
            full_name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Profile columns were added after the first release.
    add_column_if_missing(pool, "users", "birthdate", "TEXT").await?;
    add_column_if_missing(pool, "users", "profile_picture", "TEXT").await?;

    // One row per user per day; every measurement is optional.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS body_stats (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            record_date TEXT NOT NULL,

            waist REAL,
            neck REAL,
            chest REAL,
            right_arm REAL,
            left_arm REAL,
            right_forearm REAL,
            left_forearm REAL,
            shoulders REAL,
            hips REAL,
            right_thigh REAL,
            left_thigh REAL,
            right_calve REAL,
            left_calve REAL,

            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, record_date),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Device samples keyed by the vendor-assigned id within a data type.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS health_samples (
            permission TEXT NOT NULL,
            id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            data_origin TEXT NOT NULL,
            time INTEGER NOT NULL,
            value REAL NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (permission, id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_health_samples_user_time
        ON health_samples(user_id, permission, time)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool).await.unwrap();

        let rows = sqlx::query("PRAGMA table_info(users)")
            .fetch_all(&pool)
            .await
            .unwrap();
        let columns: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        assert!(columns.contains(&"birthdate".to_string()));
        assert!(columns.contains(&"profile_picture".to_string()));
    }
}
