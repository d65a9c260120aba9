use site_dashboard_sync::{
    api::{self, create_router, AppState},
    audit::AuditLog,
    backend::BackendClient,
    config::{Config, LoggingConfig},
    poller::{self, LogJob, StatusJob},
    SiteController, SiteStore,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".to_string());

    let config = Config::load(&config_path)?;

    init_tracing(&config.logging);

    info!("Starting site-dashboard-sync");
    info!("Configuration loaded from: {}", config_path);

    let backend = BackendClient::new(&config.backend.base_url, config.request_timeout())?;
    info!("Site backend: {}", backend.base_url());

    if config.demo.enabled {
        info!("Demo mode enabled: telemetry drifts while the backend is unreachable");
    }

    let addr = config.api_bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let store = Arc::new(SiteStore::new(config.demo.enabled));
    let audit = Arc::new(RwLock::new(AuditLog::new(config.audit.capacity)));

    let status_poller = poller::spawn(
        StatusJob::new(backend.clone(), store.clone()),
        config.polling.status_interval(),
    );
    let log_poller = poller::spawn(
        LogJob::new(backend.clone(), audit.clone()),
        config.polling.log_interval(),
    );

    let controller = SiteController::new(store, backend, audit);
    let state = AppState::new(controller, Some(status_poller.refresher()));
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);

    api::serve(listener, app, vec![status_poller, log_poller], shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "site_dashboard_sync={},tower_http={}",
            logging.level, logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
