//! Barangay portal binary entry point

use barangay::{AppState, config, lifecycle::local_today};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (announcement expiry sweep)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("BARANGAY__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "barangay=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "barangay=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting barangay portal...");

    // 2. Initialize metrics
    barangay::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = barangay::build_router(state.clone());

    // 6. Start background tasks
    if config.barangay.expiry_sweep_seconds > 0 {
        spawn_expiry_task(state.clone());
    }

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn the periodic announcement expiry sweep
fn spawn_expiry_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.barangay.expiry_sweep_seconds;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            let today = local_today(state.config.barangay.offset());
            match state.announcements.expire_overdue(today).await {
                Ok(expired) if expired.is_empty() => {
                    tracing::debug!("No announcements to expire");
                }
                Ok(expired) => {
                    tracing::info!(count = expired.len(), "Expired overdue announcements");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Announcement expiry sweep failed");
                }
            }
        }
    });

    tracing::info!("Announcement expiry task spawned");
}
