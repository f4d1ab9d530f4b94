use std::sync::Arc;
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use service_tracker::{Config, SystemResolver, Tracker};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        let program = args.first().map(String::as_str).unwrap_or("service-trackerd");
        eprintln!("Usage: {} HOSTNAME [CONFIG]", program);
        std::process::exit(1);
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("service_tracker=info,service_trackerd=info"))
        )
        .init();

    let hostname = args[1].clone();

    let config = match args.get(2) {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path))?;
            tracing::info!("Loaded config from {}", path);
            config
        }
        None => Config::default(),
    };

    tracing::info!("Starting service-trackerd for {}", hostname);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    let (tracker, tracker_handle) = Tracker::spawn(
        hostname,
        Arc::new(SystemResolver),
        config.tracker.clone(),
        cancel.clone(),
    )?;

    // Periodically report membership
    let report_cancel = cancel.clone();
    let report_tracker = tracker.clone();
    let report_interval = config.report.interval();
    let report_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(report_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => report(&report_tracker),
                _ = report_cancel.cancelled() => break,
            }
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let _ = tokio::join!(tracker_handle, report_handle);

    report(&tracker);
    tracing::info!("Shutdown complete");
    Ok(())
}

fn report(tracker: &Tracker) {
    let snapshot = tracker.snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => tracing::info!(
            "{}: {} active, {} removed: {}",
            tracker.name(),
            snapshot.active.len(),
            snapshot.removed.len(),
            json
        ),
        Err(e) => tracing::error!("Failed to serialize snapshot: {}", e),
    }
}
