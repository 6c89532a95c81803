//! Engine: availability polling, edge detection and the control surface

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{EngineConfig, MonitoringConfig};
use crate::inventory::{Availability, InventoryClient, Order};
use crate::purchase::{PurchaseOrchestrator, PurchaseTrigger};
use crate::state::{
    current_epoch_ms, new_state_handle, CheckTransition, LogCategory, StateHandle, StatusSnapshot,
};
use crate::SniperError;

/// Extra time granted to an in-flight check when stopping
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Running,
    StoppingRequested,
}

#[derive(Debug)]
struct Session {
    run_state: RunState,
    config: Option<Arc<MonitoringConfig>>,
}

impl Session {
    fn stopped() -> Self {
        Self {
            run_state: RunState::Stopped,
            config: None,
        }
    }
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// One monitor + orchestrator pair for a single target
pub struct Engine {
    client: Arc<dyn InventoryClient>,
    state: StateHandle,
    orchestrator: Arc<PurchaseOrchestrator>,
    request_timeout: Duration,
    session: RwLock<Session>,
    task: Mutex<Option<PollTask>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("client", &self.client.name())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(client: Arc<dyn InventoryClient>, config: &EngineConfig) -> Self {
        let state = new_state_handle(config.log_capacity);
        let request_timeout = Duration::from_secs(config.request_timeout_seconds);
        let orchestrator = Arc::new(PurchaseOrchestrator::new(
            Arc::clone(&client),
            Arc::clone(&state),
            request_timeout,
        ));

        Self {
            client,
            state,
            orchestrator,
            request_timeout,
            session: RwLock::new(Session::stopped()),
            task: Mutex::new(None),
        }
    }

    /// Handle to the observed state
    pub fn state(&self) -> StateHandle {
        Arc::clone(&self.state)
    }

    pub async fn run_state(&self) -> RunState {
        self.session.read().await.run_state
    }

    /// Accept a config and begin polling; the first check runs immediately.
    pub async fn start(&self, config: MonitoringConfig) -> crate::Result<()> {
        let mut task = self.task.lock().await;

        if self.session.read().await.run_state != RunState::Stopped {
            return Err(SniperError::AlreadyRunning);
        }
        config.validate()?;

        let config = Arc::new(config);
        {
            let mut state = self.state.write().await;
            state.reset();
            state.push_log(
                LogCategory::Monitor,
                format!(
                    "Monitoring started for {} ({})",
                    config.target_plan_code, config.identifier
                ),
            );
        }
        *self.session.write().await = Session {
            run_state: RunState::Running,
            config: Some(Arc::clone(&config)),
        };

        tracing::info!(
            "Monitoring {} via {} every {}s (auto-checkout: {})",
            config.target_plan_code,
            self.client.name(),
            config.check_interval,
            config.auto_checkout
        );

        let cancel = CancellationToken::new();
        let poller = Poller {
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
            orchestrator: Arc::clone(&self.orchestrator),
            config,
            request_timeout: self.request_timeout,
        };
        let handle = tokio::spawn(poller.run(cancel.clone()));
        *task = Some(PollTask { cancel, handle });

        Ok(())
    }

    /// Stop polling. A check already in flight may finish but schedules
    /// nothing. Calling this while stopped does nothing.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        let Some(PollTask { cancel, handle }) = task.take() else {
            tracing::debug!("Stop requested while not monitoring");
            return;
        };

        self.session.write().await.run_state = RunState::StoppingRequested;
        cancel.cancel();

        let grace = self.request_timeout.saturating_add(STOP_GRACE);
        let abort = handle.abort_handle();
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(())) => tracing::debug!("Polling task stopped gracefully"),
            Ok(Err(e)) => tracing::warn!("Polling task ended abnormally: {}", e),
            Err(_) => {
                tracing::warn!("Polling task did not stop within {:?}, aborting it", grace);
                abort.abort();
            }
        }

        self.state
            .write()
            .await
            .push_log(LogCategory::Monitor, "Monitoring stopped");
        *self.session.write().await = Session::stopped();
        tracing::info!("Monitoring stopped");
    }

    /// Snapshot of the current (or last) session
    pub async fn status(&self) -> StatusSnapshot {
        let running = self.run_state().await == RunState::Running;
        self.state.read().await.snapshot(running)
    }

    /// Buy now. Only allowed while monitoring and the target is available.
    pub async fn purchase(&self) -> crate::Result<Order> {
        let config = {
            let session = self.session.read().await;
            match (session.run_state, &session.config) {
                (RunState::Running, Some(config)) => Arc::clone(config),
                _ => return Err(SniperError::NotAvailable),
            }
        };
        let session_id = {
            let state = self.state.read().await;
            if !state.is_available {
                return Err(SniperError::NotAvailable);
            }
            state.session_id
        };

        self.orchestrator
            .purchase(&config, PurchaseTrigger::Manual, session_id)
            .await
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

/// Everything the polling task owns
struct Poller {
    client: Arc<dyn InventoryClient>,
    state: StateHandle,
    orchestrator: Arc<PurchaseOrchestrator>,
    config: Arc<MonitoringConfig>,
    request_timeout: Duration,
}

impl Poller {
    /// Check, commit, then wait a full interval after completion. At most
    /// one check is in flight at a time.
    async fn run(self, cancel: CancellationToken) {
        let interval = Duration::from_secs(self.config.check_interval);
        let plan_code = self.config.target_plan_code.as_str();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let checked_at = current_epoch_ms();
            let outcome = check_availability(
                self.client.as_ref(),
                &self.config,
                self.request_timeout,
            )
            .await;
            if let Err(e) = &outcome {
                tracing::warn!("Availability check for {} failed: {}", plan_code, e);
            }

            let (transition, session_id) = {
                let mut state = self.state.write().await;
                (state.record_check(&outcome, checked_at), state.session_id)
            };
            tracing::debug!("Check for {}: {:?}", plan_code, transition);

            if transition == CheckTransition::BecameAvailable {
                tracing::info!("{} became available", plan_code);
                if self.config.auto_checkout {
                    self.spawn_auto_purchase(session_id);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Polling loop for '{}' cancelled", plan_code);
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn spawn_auto_purchase(&self, session_id: u64) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let config = Arc::clone(&self.config);
        tokio::spawn(async move {
            match orchestrator
                .purchase(&config, PurchaseTrigger::Automatic, session_id)
                .await
            {
                Ok(order) => tracing::info!("Auto-checkout placed order {}", order.order_id),
                Err(SniperError::PurchaseAlreadyInProgress) => {
                    tracing::warn!("Auto-checkout skipped: a purchase is already in progress")
                }
                Err(e) => tracing::warn!("Auto-checkout failed: {}", e),
            }
        });
    }
}

/// One availability check bounded by `timeout`
pub async fn check_availability(
    client: &dyn InventoryClient,
    config: &MonitoringConfig,
    timeout: Duration,
) -> crate::Result<Availability> {
    let call = client.check_availability(&config.target_plan_code, config.preferred_datacenter());
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(SniperError::Timeout(format!(
            "availability check exceeded {}s",
            timeout.as_secs()
        ))),
    }
}
