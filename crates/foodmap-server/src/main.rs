mod api;
mod jobs;
mod middleware;

use std::sync::Arc;
use std::time::{Duration, Instant};

use foodmap_scraper::Scraper;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::jobs::{BrowserRunner, JobRegistry};

const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = foodmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let bind_addr = config.bind_addr;
    let retention = Duration::from_secs(config.job_retention_secs);
    let scraper = Arc::new(Scraper::from_config(config)?);
    let store = scraper.store().clone();

    let jobs = JobRegistry::new(retention);
    spawn_eviction(jobs.clone());

    let app = build_app(AppState {
        jobs,
        runner: Arc::new(BrowserRunner::new(scraper)),
        store,
        started_at: Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "foodmap server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn spawn_eviction(jobs: JobRegistry) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            ticker.tick().await;
            jobs.evict_expired().await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
