//! InventoryClient trait and provider value types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a single availability check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    /// Datacenter reporting stock, empty when nothing is available
    pub datacenter: String,
    /// Fully qualified hardware name reported by the provider
    pub fqn: String,
}

impl Availability {
    pub fn unavailable(fqn: impl Into<String>) -> Self {
        Self {
            available: false,
            datacenter: String::new(),
            fqn: fqn.into(),
        }
    }
}

/// A provider-side shopping cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub cart_id: String,
}

/// A placed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    /// Payment/confirmation page, when the provider returns one
    pub url: Option<String>,
}

/// Capability to query a hosting provider's inventory and buy from it.
///
/// `check_availability` must be side-effect free and safe to call
/// repeatedly. The purchase calls are ordered sub-steps of one checkout and
/// are only ever called in the order create, add, configure, checkout.
#[async_trait]
pub trait InventoryClient: Send + Sync + std::fmt::Debug {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Check stock for a plan, optionally restricted to one datacenter
    async fn check_availability(
        &self,
        plan_code: &str,
        datacenter: Option<&str>,
    ) -> crate::Result<Availability>;

    /// Create a cart in the given subsidiary/region
    async fn create_cart(&self, zone: &str) -> crate::Result<Cart>;

    /// Add the plan to the cart for the given commitment duration
    async fn add_item(&self, cart_id: &str, plan_code: &str, duration: &str) -> crate::Result<()>;

    /// Apply OS, duration and datacenter options to the cart's items
    async fn configure(
        &self,
        cart_id: &str,
        os: &str,
        duration: &str,
        datacenter: Option<&str>,
    ) -> crate::Result<()>;

    /// Check the cart out and return the resulting order
    async fn checkout(&self, cart_id: &str) -> crate::Result<Order>;
}
