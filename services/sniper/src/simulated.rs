//! Simulated provider for demos and dry runs

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::inventory::{Availability, Cart, InventoryClient, Order};

const SIMULATED_FQN: &str = "1801sk12.32core.128ram";
const SIMULATED_DATACENTER: &str = "rbx";

/// Provider that reports random availability and accepts every order
#[derive(Debug)]
pub struct SimulatedInventory {
    availability_probability: f64,
    sequence: AtomicU64,
}

impl SimulatedInventory {
    pub fn new(availability_probability: f64) -> Self {
        tracing::debug!(
            "Created SimulatedInventory with availability probability {}",
            availability_probability
        );
        Self {
            availability_probability: availability_probability.clamp(0.0, 1.0),
            sequence: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl InventoryClient for SimulatedInventory {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn check_availability(
        &self,
        plan_code: &str,
        datacenter: Option<&str>,
    ) -> crate::Result<Availability> {
        let available = rand::random::<f64>() < self.availability_probability;
        tracing::debug!("Simulated availability for {}: {}", plan_code, available);

        if available {
            Ok(Availability {
                available,
                datacenter: datacenter.unwrap_or(SIMULATED_DATACENTER).to_string(),
                fqn: SIMULATED_FQN.to_string(),
            })
        } else {
            Ok(Availability::unavailable(SIMULATED_FQN))
        }
    }

    async fn create_cart(&self, zone: &str) -> crate::Result<Cart> {
        let cart_id = format!("sim-cart-{}", self.next_id());
        tracing::debug!("Simulated cart {} in {}", cart_id, zone);
        Ok(Cart { cart_id })
    }

    async fn add_item(&self, cart_id: &str, plan_code: &str, duration: &str) -> crate::Result<()> {
        tracing::debug!("Simulated add {} ({}) to {}", plan_code, duration, cart_id);
        Ok(())
    }

    async fn configure(
        &self,
        cart_id: &str,
        os: &str,
        _duration: &str,
        datacenter: Option<&str>,
    ) -> crate::Result<()> {
        tracing::debug!(
            "Simulated configure {}: os={}, datacenter={:?}",
            cart_id,
            os,
            datacenter
        );
        Ok(())
    }

    async fn checkout(&self, cart_id: &str) -> crate::Result<Order> {
        let order_id = format!("sim-order-{}", self.next_id());
        tracing::debug!("Simulated checkout of {} as {}", cart_id, order_id);
        Ok(Order {
            url: Some(format!("https://example.invalid/checkout/{}", order_id)),
            order_id,
        })
    }
}
