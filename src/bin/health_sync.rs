use chrono::Utc;
use vitalgate::sync::{ExportDirSource, SyncClient, SyncSettings};

fn help_text() -> String {
    [
        "Uploads exported device health records to the API.",
        "",
        "Usage:",
        "  health-sync [--once]",
        "",
        "Required env vars:",
        "  SYNC_BASE_URL, SYNC_TOKEN, SYNC_EXPORT_DIR",
        "Optional:",
        "  SYNC_HISTORY_FILE (default: sync_history.json)",
        "  SYNC_HISTORY_RANGE (1 day, 2 days, 1 week, 15 days, 21 days, 30 days; default: 1 week)",
        "  SYNC_INTERVAL (Every 1 hour, Every 2 hours, Every 6 hours, Every 12 hours, Once a day)",
        "  SYNC_BATCH_SIZE (default: 500)",
    ]
    .join("\n")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let mut once = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--once" => once = true,
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}\n{}", other, help_text());
                std::process::exit(2);
            }
        }
    }

    let settings = SyncSettings::from_env()?;
    let range = settings.history_range()?;
    let interval = settings.interval()?;

    let source = ExportDirSource::new(&settings.export_dir);
    let client = SyncClient::new(&settings.base_url, &settings.token).with_batch_size(settings.batch_size);

    tracing::info!(
        "Syncing {} from {:?} to {} ({})",
        range.label(),
        settings.export_dir,
        settings.base_url,
        if once { "single run" } else { interval.label() }
    );

    let mut ticker = tokio::time::interval(interval.period());
    loop {
        ticker.tick().await;

        let report = client
            .run_and_record(&source, range, &settings.history_file, Utc::now(), !once)
            .await;

        if once {
            if report.failed_count > 0 || !report.errors.is_empty() {
                std::process::exit(1);
            }
            return Ok(());
        }
    }
}
