//! SessionGuard daemon.
//!
//! Connects the session store and keeps per-user session indexes clean
//! by sweeping stale entries until shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use sessionguard_auth::registry::{SessionRegistry, SessionSweeper};
use sessionguard_auth::token::StoreTokenStore;
use sessionguard_core::config::AppConfig;
use sessionguard_core::error::AppError;
use sessionguard_core::traits::SessionStore;
use sessionguard_store::StoreManager;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Daemon error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let base =
        std::env::var("SESSIONGUARD_CONFIG").unwrap_or_else(|_| "config/default".to_string());
    let env = std::env::var("SESSIONGUARD_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load_from(&base, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Wire the store, registry, and sweeper, then wait for shutdown
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SessionGuard v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Session store ────────────────────────────────────
    tracing::info!(provider = %config.store.provider, "Initializing session store");
    let store = StoreManager::new(&config.store).await?;
    if !store.health_check().await? {
        return Err(AppError::store("Session store health check failed"));
    }
    let store = store.shared();

    // ── Step 2: Registry ─────────────────────────────────────────
    let tokens = Arc::new(StoreTokenStore::new(Arc::clone(&store)));
    let registry = SessionRegistry::new(store, tokens, &config.session);
    tracing::info!(
        ttl_secs = config.session.ttl_seconds,
        multi_device = config.session.multi_device_enabled,
        lock = %config.session.admission.lock,
        eviction_scope = %config.session.admission.eviction_scope,
        "Session registry ready"
    );

    // ── Step 3: Background sweeper ───────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = SessionSweeper::new(registry, config.session.cleanup_interval());
    let sweeper_handle = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping sweeper...");
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(Duration::from_secs(30), sweeper_handle)
        .await
        .is_err()
    {
        tracing::warn!("Sweeper did not stop within 30s");
    }

    tracing::info!("SessionGuard shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
