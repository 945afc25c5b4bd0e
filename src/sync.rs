//! Client side of health ingestion: reads device records from a
//! [`HealthRecordSource`] and uploads them to `/api/v1/health/{Permission}`
//! in batches, keeping a bounded log of past runs.

use crate::models::{HealthItem, PermissionName};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const MAX_HISTORY_ENTRIES: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid export file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Unknown option: {0}")]
    UnknownOption(String),
}

// ============================================================================
// Options
// ============================================================================

/// How far back each sync run reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryRange {
    OneDay,
    TwoDays,
    #[default]
    OneWeek,
    FifteenDays,
    TwentyOneDays,
    ThirtyDays,
}

impl HistoryRange {
    pub const ALL: [HistoryRange; 6] = [
        HistoryRange::OneDay,
        HistoryRange::TwoDays,
        HistoryRange::OneWeek,
        HistoryRange::FifteenDays,
        HistoryRange::TwentyOneDays,
        HistoryRange::ThirtyDays,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HistoryRange::OneDay => "1 day",
            HistoryRange::TwoDays => "2 days",
            HistoryRange::OneWeek => "1 week",
            HistoryRange::FifteenDays => "15 days",
            HistoryRange::TwentyOneDays => "21 days",
            HistoryRange::ThirtyDays => "30 days",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            HistoryRange::OneDay => 1,
            HistoryRange::TwoDays => 2,
            HistoryRange::OneWeek => 7,
            HistoryRange::FifteenDays => 15,
            HistoryRange::TwentyOneDays => 21,
            HistoryRange::ThirtyDays => 30,
        }
    }

    pub fn parse(label: &str) -> Result<Self, SyncError> {
        Self::ALL
            .into_iter()
            .find(|r| r.label() == label)
            .ok_or_else(|| SyncError::UnknownOption(label.to_string()))
    }

    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - Duration::days(self.days()), now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncInterval {
    #[default]
    EveryHour,
    EveryTwoHours,
    EverySixHours,
    EveryTwelveHours,
    OnceADay,
}

impl SyncInterval {
    pub const ALL: [SyncInterval; 5] = [
        SyncInterval::EveryHour,
        SyncInterval::EveryTwoHours,
        SyncInterval::EverySixHours,
        SyncInterval::EveryTwelveHours,
        SyncInterval::OnceADay,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SyncInterval::EveryHour => "Every 1 hour",
            SyncInterval::EveryTwoHours => "Every 2 hours",
            SyncInterval::EverySixHours => "Every 6 hours",
            SyncInterval::EveryTwelveHours => "Every 12 hours",
            SyncInterval::OnceADay => "Once a day",
        }
    }

    pub fn hours(&self) -> u64 {
        match self {
            SyncInterval::EveryHour => 1,
            SyncInterval::EveryTwoHours => 2,
            SyncInterval::EverySixHours => 6,
            SyncInterval::EveryTwelveHours => 12,
            SyncInterval::OnceADay => 24,
        }
    }

    pub fn parse(label: &str) -> Result<Self, SyncError> {
        Self::ALL
            .into_iter()
            .find(|i| i.label() == label)
            .ok_or_else(|| SyncError::UnknownOption(label.to_string()))
    }

    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.hours() * 3600)
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct SyncSettings {
    pub base_url: String,
    pub token: String,
    pub export_dir: PathBuf,
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
    #[serde(default = "default_history_range")]
    pub history_range: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_history_file() -> PathBuf {
    PathBuf::from("sync_history.json")
}

fn default_history_range() -> String {
    HistoryRange::default().label().to_string()
}

fn default_interval() -> String {
    SyncInterval::default().label().to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl SyncSettings {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("SYNC_").from_env()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::prefixed("SYNC_").from_iter(pairs.into_iter().map(|(k, v)| (k.into(), v.into())))
    }

    pub fn history_range(&self) -> Result<HistoryRange, SyncError> {
        HistoryRange::parse(&self.history_range)
    }

    pub fn interval(&self) -> Result<SyncInterval, SyncError> {
        SyncInterval::parse(&self.interval)
    }
}

// ============================================================================
// Record sources
// ============================================================================

pub trait HealthRecordSource {
    /// Records of one data type with `start <= time <= end`.
    fn read(
        &self,
        permission: PermissionName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<HealthItem>, SyncError>> + Send;
}

/// Reads `<dir>/<slug>.json`, each a JSON array of records in the upload
/// format. A missing file means no records for that type.
#[derive(Debug, Clone)]
pub struct ExportDirSource {
    dir: PathBuf,
}

impl ExportDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, permission: PermissionName) -> PathBuf {
        self.dir.join(format!("{}.json", permission.slug()))
    }
}

impl HealthRecordSource for ExportDirSource {
    async fn read(
        &self,
        permission: PermissionName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HealthItem>, SyncError> {
        let path = self.path_for(permission);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records: Vec<Value> = serde_json::from_str(&contents)?;
        let (start_ms, end_ms) = (start.timestamp_millis(), end.timestamp_millis());

        let mut items = Vec::new();
        for record in &records {
            match HealthItem::from_json(record, permission) {
                Some(item) if item.time >= start_ms && item.time <= end_ms => items.push(item),
                Some(_) => {}
                None => tracing::warn!("Skipping malformed {} record in {:?}", permission, path),
            }
        }
        Ok(items)
    }
}

// ============================================================================
// Upload
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    batch_size: usize,
}

fn http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build sync HTTP client, using defaults: {}", e);
            reqwest::Client::new()
        })
}

impl SyncClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: http_client(DEFAULT_REQUEST_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Bounds connecting and each whole upload request.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn endpoint(&self, permission: PermissionName) -> String {
        format!("{}/api/v1/health/{}", self.base_url, permission.as_str())
    }

    /// Posts one batch; the server validates and stores it atomically.
    pub async fn upload_batch(
        &self,
        permission: PermissionName,
        items: &[HealthItem],
    ) -> Result<(), SyncError> {
        let data: Vec<Value> = items.iter().map(|item| item.to_json(permission)).collect();

        let response = self
            .http
            .post(self.endpoint(permission))
            .bearer_auth(&self.token)
            .json(&json!({ "data": data }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// One pass over every data type. Failures are counted and reported
    /// without stopping the remaining types.
    pub async fn run_once<S: HealthRecordSource>(
        &self,
        source: &S,
        range: HistoryRange,
        now: DateTime<Utc>,
    ) -> SyncReport {
        let (start, end) = range.window(now);
        let mut report = SyncReport::default();

        for permission in PermissionName::ALL {
            let items = match source.read(permission, start, end).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("Failed to read {} records: {}", permission, e);
                    report.errors.push(format!("{}: {}", permission, e));
                    continue;
                }
            };

            for batch in items.chunks(self.batch_size) {
                match self.upload_batch(permission, batch).await {
                    Ok(()) => report.success_count += batch.len(),
                    Err(e) => {
                        tracing::warn!("Failed to upload {} batch: {}", permission, e);
                        report.failed_count += batch.len();
                        report.errors.push(format!("{}: {}", permission, e));
                    }
                }
            }
        }

        tracing::info!(
            "Sync finished: {} uploaded, {} failed",
            report.success_count,
            report.failed_count
        );
        report
    }

    /// Runs one pass and appends it to the history file. A history file
    /// that cannot be read or written is logged and does not fail the run.
    pub async fn run_and_record<S: HealthRecordSource>(
        &self,
        source: &S,
        range: HistoryRange,
        history_file: &Path,
        now: DateTime<Utc>,
        is_background_sync: bool,
    ) -> SyncReport {
        let report = self.run_once(source, range, now).await;
        let entry = SyncHistoryEntry::from_report(&report, now, is_background_sync);
        if let Err(e) = SyncHistory::append(history_file, entry).await {
            tracing::warn!("Failed to record sync history in {:?}: {}", history_file, e);
        }
        report
    }
}

// ============================================================================
// History log
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryEntry {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
    pub is_background_sync: bool,
}

impl SyncHistoryEntry {
    pub fn from_report(report: &SyncReport, at: DateTime<Utc>, is_background_sync: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: at.timestamp_millis(),
            success_count: report.success_count,
            failed_count: report.failed_count,
            errors: report.errors.clone(),
            is_background_sync,
        }
    }
}

/// Newest first, at most [`MAX_HISTORY_ENTRIES`] entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SyncHistory {
    entries: Vec<SyncHistoryEntry>,
}

impl SyncHistory {
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), SyncError> {
        tokio::fs::write(path, serde_json::to_string_pretty(self)?).await?;
        Ok(())
    }

    pub async fn append(path: &Path, entry: SyncHistoryEntry) -> Result<(), SyncError> {
        let mut history = Self::load(path).await?;
        history.record(entry);
        history.save(path).await
    }

    pub fn record(&mut self, entry: SyncHistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY_ENTRIES);
    }

    pub fn entries(&self) -> &[SyncHistoryEntry] {
        &self.entries
    }
}
