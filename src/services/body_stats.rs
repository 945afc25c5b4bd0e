use crate::db::query::{Direction, Select};
use crate::models::{
    BodyStatField, BodyStats, BodyStatsUpdate, HistoryField, HistoryItem, HistoryPeriod,
    LatestValue, PermissionName,
};
use crate::{AppError, Result};
use chrono::{DateTime, Months, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn date_string(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

pub fn epoch_ms_to_date(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(date_string)
        .unwrap_or_default()
}

/// Lower bound of a history window, `None` for all time.
pub fn start_date(period: HistoryPeriod, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match period {
        HistoryPeriod::Month => now.checked_sub_months(Months::new(1)),
        HistoryPeriod::Year => now.checked_sub_months(Months::new(12)),
        HistoryPeriod::All => None,
    }
}

/// Weight in kilograms over height in metres squared, one decimal place.
pub fn bmi(weight_kg: f64, height_m: f64) -> Option<f64> {
    if height_m <= 0.0 {
        return None;
    }
    Some((weight_kg / (height_m * height_m) * 10.0).round() / 10.0)
}

async fn fetch_today(pool: &SqlitePool, user_id: &str, today: &str) -> Result<Option<BodyStats>> {
    let row = Select::from("body_stats")
        .where_eq("user_id", user_id)
        .where_eq("record_date", today)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn today(pool: &SqlitePool, user_id: &str) -> Result<Option<BodyStats>> {
    fetch_today(pool, user_id, &date_string(Utc::now())).await
}

/// Inserts today's record or updates only the supplied fields of the
/// existing one.
pub async fn create_or_update_today(
    pool: &SqlitePool,
    user_id: &str,
    update: &BodyStatsUpdate,
) -> Result<BodyStats> {
    let now = Utc::now();
    let today = date_string(now);
    let timestamp = now.to_rfc3339();

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO body_stats (id, user_id, record_date, created_at, updated_at");
    for (field, _) in &update.values {
        qb.push(", ").push(field.as_str());
    }

    qb.push(") VALUES (");
    {
        let mut values = qb.separated(", ");
        values.push_bind(Uuid::new_v4().to_string());
        values.push_bind(user_id.to_string());
        values.push_bind(today.clone());
        values.push_bind(timestamp.clone());
        values.push_bind(timestamp);
        for (_, value) in &update.values {
            values.push_bind(*value);
        }
    }

    qb.push(") ON CONFLICT (user_id, record_date) DO UPDATE SET updated_at = excluded.updated_at");
    for (field, _) in &update.values {
        qb.push(", ")
            .push(field.as_str())
            .push(" = excluded.")
            .push(field.as_str());
    }

    qb.build().execute(pool).await?;

    fetch_today(pool, user_id, &today)
        .await?
        .ok_or_else(|| AppError::Internal("Body stats row missing after upsert".to_string()))
}

async fn samples_since(
    pool: &SqlitePool,
    user_id: &str,
    permission: PermissionName,
    start: Option<DateTime<Utc>>,
) -> Result<Vec<(i64, f64)>> {
    let rows = Select::from("health_samples")
        .columns(&["time", "value"])
        .where_eq("user_id", user_id)
        .where_eq("permission", permission.as_str())
        .where_gte_opt("time", start.map(|s| s.timestamp_millis()))
        .order_by("time", Direction::Asc)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn latest_sample(
    pool: &SqlitePool,
    user_id: &str,
    permission: PermissionName,
) -> Result<Option<(i64, f64)>> {
    let row = Select::from("health_samples")
        .columns(&["time", "value"])
        .where_eq("user_id", user_id)
        .where_eq("permission", permission.as_str())
        .order_by("time", Direction::Desc)
        .limit(1)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

fn sample_items(samples: Vec<(i64, f64)>) -> Vec<HistoryItem> {
    samples
        .into_iter()
        .map(|(time, value)| HistoryItem {
            record_date: epoch_ms_to_date(time),
            value: Some(value),
        })
        .collect()
}

pub async fn history(
    pool: &SqlitePool,
    user_id: &str,
    field: HistoryField,
    period: HistoryPeriod,
) -> Result<Vec<HistoryItem>> {
    let start = start_date(period, Utc::now());

    match field {
        HistoryField::Measurement(column) => {
            let items = Select::from("body_stats")
                .columns(&["record_date"])
                .column_as(column.as_str(), "value")
                .where_eq("user_id", user_id)
                .where_gte_opt("record_date", start.map(date_string))
                .where_not_null(column.as_str())
                .order_by("record_date", Direction::Asc)
                .fetch_all(pool)
                .await?;
            Ok(items)
        }
        HistoryField::Weight => {
            let samples = samples_since(pool, user_id, PermissionName::Weight, start).await?;
            Ok(sample_items(samples))
        }
        HistoryField::Height => {
            let samples = samples_since(pool, user_id, PermissionName::Height, start).await?;
            Ok(sample_items(samples))
        }
        HistoryField::Bmi => {
            let Some((_, height)) = latest_sample(pool, user_id, PermissionName::Height).await?
            else {
                return Ok(Vec::new());
            };
            if height <= 0.0 {
                return Ok(Vec::new());
            }

            let weights = samples_since(pool, user_id, PermissionName::Weight, start).await?;
            Ok(weights
                .into_iter()
                .map(|(time, weight)| HistoryItem {
                    record_date: epoch_ms_to_date(time),
                    value: bmi(weight, height),
                })
                .collect())
        }
    }
}

pub async fn latest(pool: &SqlitePool, user_id: &str) -> Result<BTreeMap<String, LatestValue>> {
    let mut result = BTreeMap::new();

    for field in BodyStatField::ALL {
        let row: Option<HistoryItem> = Select::from("body_stats")
            .columns(&["record_date"])
            .column_as(field.as_str(), "value")
            .where_eq("user_id", user_id)
            .where_not_null(field.as_str())
            .order_by("record_date", Direction::Desc)
            .limit(1)
            .fetch_optional(pool)
            .await?;

        let latest = row
            .map(|item| LatestValue {
                value: item.value,
                record_date: Some(item.record_date),
            })
            .unwrap_or_default();
        result.insert(field.as_str().to_string(), latest);
    }

    let weight = latest_sample(pool, user_id, PermissionName::Weight).await?;
    let height = latest_sample(pool, user_id, PermissionName::Height).await?;

    let from_sample = |sample: Option<(i64, f64)>| {
        sample
            .map(|(time, value)| LatestValue {
                value: Some(value),
                record_date: Some(epoch_ms_to_date(time)),
            })
            .unwrap_or_default()
    };

    let bmi_value = match (weight, height) {
        (Some((weight_time, weight)), Some((height_time, height))) => match bmi(weight, height) {
            Some(value) => LatestValue {
                value: Some(value),
                record_date: Some(epoch_ms_to_date(weight_time.max(height_time))),
            },
            None => LatestValue::default(),
        },
        _ => LatestValue::default(),
    };

    result.insert("weight".to_string(), from_sample(weight));
    result.insert("height".to_string(), from_sample(height));
    result.insert("bmi".to_string(), bmi_value);

    Ok(result)
}
