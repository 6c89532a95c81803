//! Sniper - dedicated server availability monitor and auto-purchaser
//!
//! Polls a provider for a target plan, detects the moment it becomes
//! available, and runs the cart/configure/checkout pipeline.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod io;
pub mod ovh;
pub mod purchase;
pub mod simulated;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{load_config, Config};
pub use engine::{Engine, RunState};
pub use error::{PurchaseError, Result, SniperError};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ProviderConfig;
use crate::inventory::InventoryClient;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::ovh::OvhClient;
use crate::simulated::SimulatedInventory;

/// Build the inventory client selected by the provider config
pub fn build_inventory(
    provider: &ProviderConfig,
    http: Arc<dyn HttpClient>,
) -> Result<Arc<dyn InventoryClient>> {
    let client: Arc<dyn InventoryClient> = match provider {
        ProviderConfig::Simulated {
            availability_probability,
        } => Arc::new(SimulatedInventory::new(*availability_probability)),
        ProviderConfig::Ovh { .. } => Arc::new(OvhClient::new(provider, http)?),
    };
    tracing::debug!("Using {} inventory provider", client.name());
    Ok(client)
}

/// Run the sniper service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    config.engine.validate()?;
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::default());
    let inventory = build_inventory(&config.provider, http)?;
    let engine = Arc::new(Engine::new(inventory, &config.engine));
    let cancel = CancellationToken::new();

    if let Some(monitoring) = config.monitoring.clone() {
        engine.start(monitoring).await?;
    }

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
        }
        cancel_for_signal.cancel();
    });

    let server = if config.server.enabled {
        let port = config.server.port;
        let router = api::build_router(Arc::clone(&engine));
        let cancel_for_server = cancel.clone();

        Some(tokio::spawn(async move {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind control API to port {}: {}. Continuing without it.",
                        port,
                        e
                    );
                    return;
                }
            };
            tracing::info!("Control API listening on http://{}", addr);

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_server.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Control API stopped");
        }))
    } else {
        None
    };

    tracing::info!("Sniper started");

    cancel.cancelled().await;

    engine.stop().await;
    if let Some(server) = server {
        server.await.ok();
    }
    tracing::info!("Sniper stopped");

    Ok(())
}
