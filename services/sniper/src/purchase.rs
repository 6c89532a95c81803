//! Purchase orchestrator: cart, item, configuration, checkout

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::MonitoringConfig;
use crate::error::PurchaseError;
use crate::inventory::{InventoryClient, Order};
use crate::state::{LogCategory, StateHandle};
use crate::SniperError;

/// What started a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseTrigger {
    /// Rising availability edge with auto-checkout enabled
    Automatic,
    /// Explicit request through the control surface
    Manual,
}

impl PurchaseTrigger {
    fn log_message(self) -> &'static str {
        match self {
            PurchaseTrigger::Automatic => "Auto-checkout initiated",
            PurchaseTrigger::Manual => "Purchase initiated manually",
        }
    }
}

/// Runs the four-step acquisition pipeline, one run at a time.
///
/// Every executed step appends exactly one pipeline log entry. The pipeline
/// stops at the first failing step; carts left behind expire on the
/// provider side.
pub struct PurchaseOrchestrator {
    client: Arc<dyn InventoryClient>,
    state: StateHandle,
    step_timeout: Duration,
    in_flight: Mutex<()>,
}

impl std::fmt::Debug for PurchaseOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseOrchestrator")
            .field("client", &self.client.name())
            .field("step_timeout", &self.step_timeout)
            .field("in_progress", &self.is_in_progress())
            .finish()
    }
}

impl PurchaseOrchestrator {
    pub fn new(client: Arc<dyn InventoryClient>, state: StateHandle, step_timeout: Duration) -> Self {
        Self {
            client,
            state,
            step_timeout,
            in_flight: Mutex::new(()),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Execute the pipeline once for monitoring session `session_id`.
    /// Fails fast when another run is in flight. Once that session has been
    /// replaced, log entries go to tracing only.
    pub async fn purchase(
        &self,
        config: &MonitoringConfig,
        trigger: PurchaseTrigger,
        session_id: u64,
    ) -> crate::Result<Order> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SniperError::PurchaseAlreadyInProgress)?;

        tracing::info!(
            "{} for {} in zone {}",
            trigger.log_message(),
            config.target_plan_code,
            config.zone
        );
        self.log(session_id, LogCategory::Monitor, trigger.log_message()).await;

        let cart = match self
            .bounded("create cart", self.client.create_cart(&config.zone))
            .await
        {
            Ok(cart) => cart,
            Err(e) => return Err(self.abort(session_id, PurchaseError::CartCreationFailed(e.to_string())).await),
        };
        self.log(
            session_id,
            LogCategory::Pipeline,
            format!("Cart {} created in zone {}", cart.cart_id, config.zone),
        )
        .await;

        let added = self
            .bounded(
                "add item",
                self.client.add_item(
                    &cart.cart_id,
                    &config.target_plan_code,
                    &config.target_duration,
                ),
            )
            .await;
        if let Err(e) = added {
            return Err(self.abort(session_id, PurchaseError::AddToCartFailed(e.to_string())).await);
        }
        self.log(
            session_id,
            LogCategory::Pipeline,
            format!(
                "Added {} ({}) to cart {}",
                config.target_plan_code, config.target_duration, cart.cart_id
            ),
        )
        .await;

        let datacenter = config.preferred_datacenter();
        let configured = self
            .bounded(
                "configure",
                self.client.configure(
                    &cart.cart_id,
                    &config.target_os,
                    &config.target_duration,
                    datacenter,
                ),
            )
            .await;
        if let Err(e) = configured {
            return Err(self.abort(session_id, PurchaseError::ConfigurationFailed(e.to_string())).await);
        }
        self.log(
            session_id,
            LogCategory::Pipeline,
            format!(
                "Configured cart {}: os={}, duration={}, datacenter={}",
                cart.cart_id,
                config.target_os,
                config.target_duration,
                datacenter.unwrap_or("any")
            ),
        )
        .await;

        let order = match self
            .bounded("checkout", self.client.checkout(&cart.cart_id))
            .await
        {
            Ok(order) => order,
            Err(e) => return Err(self.abort(session_id, PurchaseError::CheckoutFailed(e.to_string())).await),
        };
        self.log(
            session_id,
            LogCategory::Pipeline,
            format!("Order completed! Order ID: {}", order.order_id),
        )
        .await;

        tracing::info!("Order {} placed for {}", order.order_id, config.target_plan_code);
        Ok(order)
    }

    async fn bounded<T>(
        &self,
        step: &str,
        call: impl Future<Output = crate::Result<T>>,
    ) -> crate::Result<T> {
        tracing::debug!("Purchase step '{}' via {}", step, self.client.name());
        match tokio::time::timeout(self.step_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SniperError::Timeout(format!(
                "{} exceeded {}s",
                step,
                self.step_timeout.as_secs()
            ))),
        }
    }

    async fn abort(&self, session_id: u64, error: PurchaseError) -> SniperError {
        tracing::warn!("Purchase aborted: {}", error);
        self.log(session_id, LogCategory::Pipeline, error.to_string())
            .await;
        SniperError::Purchase(error)
    }

    async fn log(&self, session_id: u64, category: LogCategory, message: impl Into<String>) {
        let mut state = self.state.write().await;
        if state.session_id == session_id {
            state.push_log(category, message);
        } else {
            tracing::info!(
                "Purchase from ended session {}: {}",
                session_id,
                message.into()
            );
        }
    }
}
