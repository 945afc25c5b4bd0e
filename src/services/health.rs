use crate::db::query::Select;
use crate::models::{HealthBatch, StoreResult};
use crate::Result;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Keeps the `IN (...)` list under SQLite's bind parameter limit.
const LOOKUP_CHUNK: usize = 500;

/// Stores the batch for `user_id`. Items whose id already exists for the
/// permission are skipped and reported in request order.
pub async fn store(pool: &SqlitePool, user_id: &str, batch: &HealthBatch) -> Result<StoreResult> {
    let permission = batch.permission.as_str();
    let ids: Vec<&str> = batch.items.iter().map(|item| item.id.as_str()).collect();

    let mut existing: HashSet<String> = HashSet::new();
    for chunk in ids.chunks(LOOKUP_CHUNK) {
        let rows: Vec<(String,)> = Select::from("health_samples")
            .columns(&["id"])
            .where_eq("permission", permission)
            .where_in("id", chunk.iter().copied())
            .fetch_all(pool)
            .await?;
        existing.extend(rows.into_iter().map(|(id,)| id));
    }

    let mut skipped = Vec::new();
    let mut inserted = 0;
    let now = Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;
    for item in &batch.items {
        if existing.contains(&item.id) {
            skipped.push(item.id.clone());
            continue;
        }

        // A concurrent request may have stored the same id since the lookup.
        let result = sqlx::query(
            r#"
            INSERT INTO health_samples (permission, id, user_id, data_origin, time, value, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (permission, id) DO NOTHING
            "#,
        )
        .bind(permission)
        .bind(&item.id)
        .bind(user_id)
        .bind(&item.data_origin)
        .bind(item.time)
        .bind(item.value)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            skipped.push(item.id.clone());
        } else {
            inserted += 1;
        }
    }
    tx.commit().await?;

    tracing::info!(
        "Stored {} {} samples for user {} ({} skipped)",
        inserted,
        permission,
        user_id,
        skipped.len()
    );

    Ok(StoreResult { inserted, skipped })
}

pub fn archive(user_id: &str, payload: &Value) {
    tracing::info!("Archive payload from user {}: {}", user_id, payload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{HealthItem, PermissionName};

    fn item(id: &str, value: f64) -> HealthItem {
        HealthItem {
            id: id.to_string(),
            data_origin: "com.example.scale".to_string(),
            time: 1_700_000_000_000,
            value,
        }
    }

    async fn seed_user(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, full_name, created_at, updated_at) \
             VALUES (?, ?, 'x', 'Test', '', '')",
        )
        .bind(id)
        .bind(format!("{}@example.com", id))
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_store_is_idempotent_per_permission() {
        let pool = test_pool().await;
        seed_user(&pool, "u1").await;

        let batch = HealthBatch {
            permission: PermissionName::Weight,
            items: vec![item("a", 80.0), item("b", 79.5)],
        };
        let first = store(&pool, "u1", &batch).await.unwrap();
        assert_eq!(first, StoreResult { inserted: 2, skipped: vec![] });

        let again = HealthBatch {
            permission: PermissionName::Weight,
            items: vec![item("c", 79.0), item("b", 79.5), item("a", 80.0)],
        };
        let second = store(&pool, "u1", &again).await.unwrap();
        assert_eq!(second.inserted, 1);
        assert_eq!(second.skipped, vec!["b".to_string(), "a".to_string()]);

        // Same id under another data type is a different sample.
        let other = HealthBatch {
            permission: PermissionName::BoneMass,
            items: vec![item("a", 3.1)],
        };
        assert_eq!(store(&pool, "u1", &other).await.unwrap().inserted, 1);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM health_samples")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 4);
    }

    #[tokio::test]
    async fn test_store_large_batch() {
        let pool = test_pool().await;
        seed_user(&pool, "u1").await;

        let items: Vec<_> = (0..1200).map(|i| item(&format!("id-{i}"), 70.0)).collect();
        let batch = HealthBatch {
            permission: PermissionName::Weight,
            items,
        };
        assert_eq!(store(&pool, "u1", &batch).await.unwrap().inserted, 1200);

        let repeat = store(&pool, "u1", &batch).await.unwrap();
        assert_eq!(repeat.inserted, 0);
        assert_eq!(repeat.skipped.len(), 1200);
    }
}
