//! Inventory client double driven by scenario steps

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sniper::inventory::{Availability, Cart, InventoryClient, Order};
use sniper::SniperError;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Available,
    Unavailable,
    Error,
}

impl std::str::FromStr for CheckOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "true" => Ok(CheckOutcome::Available),
            "false" => Ok(CheckOutcome::Unavailable),
            "error" => Ok(CheckOutcome::Error),
            other => Err(format!("unknown check outcome: {}", other)),
        }
    }
}

/// Answers checks from a script (then "unavailable") and records every call
#[derive(Debug, Default)]
pub struct ScriptedInventory {
    script: Mutex<VecDeque<CheckOutcome>>,
    failing_step: Mutex<Option<String>>,
    cart_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedInventory {
    pub fn script(&self, outcomes: impl IntoIterator<Item = CheckOutcome>) {
        self.script.lock().unwrap().extend(outcomes);
    }

    pub fn fail_at(&self, step: &str) {
        *self.failing_step.lock().unwrap() = Some(step.to_string());
    }

    pub fn hold_cart_creation(&self, gate: Arc<Notify>) {
        *self.cart_gate.lock().unwrap() = Some(gate);
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| *call == name)
            .count()
    }

    fn record(&self, name: &str) -> sniper::Result<()> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.failing_step.lock().unwrap().as_deref() == Some(name) {
            return Err(SniperError::Provider {
                status: 400,
                message: format!("{} refused by provider", name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryClient for ScriptedInventory {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn check_availability(
        &self,
        plan_code: &str,
        datacenter: Option<&str>,
    ) -> sniper::Result<Availability> {
        self.calls.lock().unwrap().push("check".to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next.unwrap_or(CheckOutcome::Unavailable) {
            CheckOutcome::Available => Ok(Availability {
                available: true,
                datacenter: datacenter.unwrap_or("rbx").to_string(),
                fqn: plan_code.to_string(),
            }),
            CheckOutcome::Unavailable => Ok(Availability::unavailable(plan_code)),
            CheckOutcome::Error => Err(SniperError::Http("upstream unreachable".to_string())),
        }
    }

    async fn create_cart(&self, _zone: &str) -> sniper::Result<Cart> {
        let gate = self.cart_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record("create_cart")?;
        Ok(Cart {
            cart_id: format!("cart-{}", self.calls_to("create_cart")),
        })
    }

    async fn add_item(&self, _cart_id: &str, _plan_code: &str, _duration: &str) -> sniper::Result<()> {
        self.record("add_item")
    }

    async fn configure(
        &self,
        _cart_id: &str,
        _os: &str,
        _duration: &str,
        _datacenter: Option<&str>,
    ) -> sniper::Result<()> {
        self.record("configure")
    }

    async fn checkout(&self, cart_id: &str) -> sniper::Result<Order> {
        self.record("checkout")?;
        Ok(Order {
            order_id: format!("order-{}", cart_id),
            url: None,
        })
    }
}
