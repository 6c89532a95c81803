//! BDD test world for sniper service

use std::sync::Arc;

use cucumber::World;
use sniper::config::{EngineConfig, MonitoringConfig};
use sniper::inventory::Order;
use sniper::Engine;
use tokio::sync::Notify;

#[path = "scripted_inventory.rs"]
pub mod scripted_inventory;

use scripted_inventory::ScriptedInventory;

#[derive(Debug, Default, World)]
pub struct SniperWorld {
    pub inventory: Option<Arc<ScriptedInventory>>,
    pub cart_gate: Option<Arc<Notify>>,
    pub engine: Option<Arc<Engine>>,
    pub start_result: Option<sniper::Result<()>>,
    pub purchase_result: Option<sniper::Result<Order>>,
}

impl SniperWorld {
    pub fn inventory(&mut self) -> Arc<ScriptedInventory> {
        Arc::clone(
            self.inventory
                .get_or_insert_with(|| Arc::new(ScriptedInventory::default())),
        )
    }

    /// The engine under test, built around the scripted inventory on first use
    pub fn engine(&mut self) -> Arc<Engine> {
        if let Some(engine) = &self.engine {
            return Arc::clone(engine);
        }
        let engine = Arc::new(Engine::new(self.inventory(), &EngineConfig::default()));
        self.engine = Some(Arc::clone(&engine));
        engine
    }
}

pub fn monitoring_config(check_interval: u64, auto_checkout: bool) -> MonitoringConfig {
    MonitoringConfig {
        identifier: "ks-le-1".to_string(),
        zone: "FR".to_string(),
        target_plan_code: "24ska01".to_string(),
        target_os: "none_64.en".to_string(),
        target_duration: "P1M".to_string(),
        datacenter: Some("gra".to_string()),
        check_interval,
        auto_checkout,
    }
}
