//! Scripted InventoryClient used by the unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::config::MonitoringConfig;
use crate::inventory::{Availability, Cart, InventoryClient, Order};
use crate::SniperError;

/// Purchase step a fake should fail at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    CreateCart,
    AddItem,
    Configure,
    Checkout,
}

/// Availability answers are scripted as `Some(available)` or `None` for an error.
/// Once the script runs out every check reports "unavailable".
#[derive(Debug, Default)]
pub struct FakeInventory {
    script: Mutex<VecDeque<Option<bool>>>,
    fail_at: Option<FailAt>,
    check_delay: Option<Duration>,
    cart_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<&'static str>>,
    in_flight_checks: AtomicUsize,
    max_in_flight_checks: AtomicUsize,
}

impl FakeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: &[Option<bool>]) -> Self {
        self.script = Mutex::new(script.iter().copied().collect());
        self
    }

    pub fn failing_at(mut self, step: FailAt) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    /// Hold `create_cart` until the gate is notified
    pub fn with_cart_gate(mut self, gate: Arc<Notify>) -> Self {
        self.cart_gate = Some(gate);
        self
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == name)
            .count()
    }

    pub fn max_in_flight_checks(&self) -> usize {
        self.max_in_flight_checks.load(Ordering::SeqCst)
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn step_result(&self, step: FailAt) -> crate::Result<()> {
        if self.fail_at == Some(step) {
            Err(SniperError::Provider {
                status: 400,
                message: format!("{:?} rejected", step),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InventoryClient for FakeInventory {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_availability(
        &self,
        plan_code: &str,
        datacenter: Option<&str>,
    ) -> crate::Result<Availability> {
        self.record("check_availability");
        let in_flight = self.in_flight_checks.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_checks
            .fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.check_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight_checks.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Some(true)) => Ok(Availability {
                available: true,
                datacenter: datacenter.unwrap_or("gra").to_string(),
                fqn: plan_code.to_string(),
            }),
            Some(None) => Err(SniperError::Http("connection reset by peer".to_string())),
            Some(Some(false)) | None => Ok(Availability::unavailable(plan_code)),
        }
    }

    async fn create_cart(&self, _zone: &str) -> crate::Result<Cart> {
        self.record("create_cart");
        if let Some(gate) = &self.cart_gate {
            gate.notified().await;
        }
        self.step_result(FailAt::CreateCart)?;
        Ok(Cart {
            cart_id: format!("cart-{}", self.calls_to("create_cart")),
        })
    }

    async fn add_item(&self, _cart_id: &str, _plan_code: &str, _duration: &str) -> crate::Result<()> {
        self.record("add_item");
        self.step_result(FailAt::AddItem)
    }

    async fn configure(
        &self,
        _cart_id: &str,
        _os: &str,
        _duration: &str,
        _datacenter: Option<&str>,
    ) -> crate::Result<()> {
        self.record("configure");
        self.step_result(FailAt::Configure)
    }

    async fn checkout(&self, cart_id: &str) -> crate::Result<Order> {
        self.record("checkout");
        self.step_result(FailAt::Checkout)?;
        Ok(Order {
            order_id: format!("order-for-{}", cart_id),
            url: None,
        })
    }
}

pub fn monitoring_config(auto_checkout: bool) -> MonitoringConfig {
    MonitoringConfig {
        identifier: "ks-a".to_string(),
        zone: "FR".to_string(),
        target_plan_code: "24ska01".to_string(),
        target_os: "none_64.en".to_string(),
        target_duration: "P1M".to_string(),
        datacenter: None,
        check_interval: 30,
        auto_checkout,
    }
}
