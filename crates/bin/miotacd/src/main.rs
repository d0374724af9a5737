//! # miotacd: miotac daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Build the device connector serving the configured simulated units
//! - Construct the integration, set up persisted entries and import the
//!   devices listed in the configuration
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;

use miotac_adapter_http_axum::router;
use miotac_adapter_http_axum::state::AppState;
use miotac_adapter_simulated::{SimulatedAirConditioner, SimulatedConnector};
use miotac_adapter_storage_sqlite_sqlx::{Config as DatabaseConfig, SqliteConfigEntryRepository};
use miotac_app::event_bus::InProcessEventBus;
use miotac_app::ports::{ConfigEntryRepository, DeviceConnector, EventPublisher};
use miotac_app::services::config_flow::FlowResult;
use miotac_app::services::integration::MiotIntegration;
use miotac_app::services::probe::ERROR_PLATFORM_NOT_READY;

use crate::config::{Config, DeviceConfig, SimulationConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DatabaseConfig::new(config.database_url())
        .build()
        .await
        .context("failed to open database")?;
    let repo = SqliteConfigEntryRepository::new(db.pool().clone());

    // Devices
    let connector = simulated_connector(&config.simulation)?;
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let integration = Arc::new(MiotIntegration::new(
        connector,
        repo,
        Arc::clone(&event_bus),
        config.integration_settings(),
    ));

    integration
        .setup_all()
        .await
        .context("failed to load config entries")?;
    import_devices(&integration, &config.devices).await;

    // HTTP
    let app = router::build(AppState::new(Arc::clone(&integration), event_bus));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "miotacd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    integration.shutdown();
    db.close().await;
    tracing::info!("miotacd stopped");
    Ok(())
}

fn simulated_connector(simulation: &SimulationConfig) -> anyhow::Result<SimulatedConnector> {
    let mut connector = SimulatedConnector::new();
    for unit in &simulation.devices {
        connector.add(
            unit.host.clone(),
            unit.token()?,
            SimulatedAirConditioner::new(unit.model.clone(), unit.mac.clone()),
        );
        tracing::info!(host = %unit.host, model = %unit.model, "serving simulated unit");
    }
    if connector.is_empty() {
        tracing::warn!("no simulated units configured, every device will be unreachable");
    } else {
        tracing::info!(units = connector.len(), "simulated connector ready");
    }
    Ok(connector)
}

/// Import the configured devices as config entries. Offline devices are
/// imported in the background once they answer; devices that are already
/// configured or unsupported are logged and skipped.
async fn import_devices<C, R, P>(integration: &MiotIntegration<C, R, P>, devices: &[DeviceConfig])
where
    C: DeviceConnector,
    R: ConfigEntryRepository + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    for device in devices {
        let data = match device.entry_data() {
            Ok(data) => data,
            Err(err) => {
                tracing::error!(host = %device.host, error = %err, "skipping device");
                continue;
            }
        };
        match integration.import_entry(data).await {
            Ok(FlowResult::CreateEntry { entry }) => {
                tracing::info!(host = %device.host, entry_id = %entry.entry_id, "device imported");
            }
            Ok(FlowResult::Abort {
                reason: ERROR_PLATFORM_NOT_READY,
            }) => {
                tracing::info!(host = %device.host, "device offline, import deferred");
            }
            Ok(FlowResult::Abort { reason }) => {
                tracing::info!(host = %device.host, reason, "device not imported");
            }
            Ok(FlowResult::ShowForm { errors, .. }) => {
                tracing::warn!(host = %device.host, ?errors, "device settings rejected");
            }
            Err(err) => {
                tracing::error!(host = %device.host, error = %err, "failed to import device");
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown requested");
}
