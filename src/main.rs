mod aggregate;
mod config;
mod handlers;
mod jobs;
mod models;
mod router;
mod schema;
mod views;

use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aggregate::{aggregate, AggregateError, Submission};
use config::Config;
use jobs::{AnsibleRunner, BatchExecutor};
use models::BatchResult;
use schema::DeviceClassSchema;
use views::Views;

/// Application state shared across handlers
pub struct AppState {
    pub executor: BatchExecutor,
    pub views: Views,
}

impl AppState {
    pub fn new(executor: BatchExecutor, views: Views) -> Self {
        Self { executor, views }
    }

    /// Read every device out of a submission and configure each of them.
    /// Fails only when the submission holds no usable device.
    pub async fn provision(
        &self,
        schema: &DeviceClassSchema,
        submission: &Submission,
    ) -> Result<BatchResult, AggregateError> {
        let records = aggregate(submission, schema)?;
        Ok(self.executor.execute(schema, &records).await)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "net_provision=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    tracing::info!("Starting NetProvision Server");
    tracing::info!("Ansible projects: {}", cfg.ansible_base_dir);
    tracing::info!("Playbook binary: {}", cfg.ansible_playbook_bin);
    tracing::info!("Job concurrency: {}", cfg.job_concurrency);
    tracing::info!("Listen: {}", cfg.listen_addr);

    let runner = AnsibleRunner::new(cfg.ansible_playbook_bin.clone(), &cfg.ansible_base_dir);
    let executor = BatchExecutor::new(Arc::new(runner), cfg.credentials.clone(), cfg.job_concurrency);
    let views = Views::new()?;

    // Create app state
    let state = Arc::new(AppState::new(executor, views));

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("NetProvision listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("NetProvision shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
