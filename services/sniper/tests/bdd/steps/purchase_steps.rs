//! BDD step definitions for the purchase pipeline

use std::sync::Arc;

use cucumber::{given, then, when};
use sniper::state::LogCategory;
use tokio::sync::Notify;

use super::error_name;
use crate::world::SniperWorld;

#[given(expr = "a provider that fails at {string}")]
fn provider_fails_at(world: &mut SniperWorld, failing: String) {
    world.inventory().fail_at(&failing);
}

#[given("a provider that holds cart creation")]
fn provider_holds_carts(world: &mut SniperWorld) {
    let gate = Arc::new(Notify::new());
    world.inventory().hold_cart_creation(Arc::clone(&gate));
    world.cart_gate = Some(gate);
}

#[when("a manual purchase is requested")]
async fn manual_purchase(world: &mut SniperWorld) {
    let engine = world.engine();
    world.purchase_result = Some(engine.purchase().await);
}

#[when("the held cart creation is released")]
async fn release_cart(world: &mut SniperWorld) {
    let gate = world.cart_gate.as_ref().expect("cart creation is not held");
    gate.notify_one();
    tokio::task::yield_now().await;
}

#[then(expr = "the purchase pipeline ran {int} time(s)")]
fn pipeline_ran(world: &mut SniperWorld, expected: usize) {
    assert_eq!(world.inventory().calls_to("create_cart"), expected);
}

#[then(expr = "{int} order(s) was/were placed")]
fn orders_placed(world: &mut SniperWorld, expected: usize) {
    assert_eq!(world.inventory().calls_to("checkout"), expected);
}

#[then(expr = "the purchase fails with {string}")]
fn purchase_fails(world: &mut SniperWorld, expected: String) {
    match world.purchase_result.as_ref().expect("no purchase requested") {
        Err(e) => assert_eq!(error_name(e), expected),
        Ok(order) => panic!("expected {} but got order {:?}", expected, order),
    }
}

#[then(expr = "the purchase returns order {string}")]
fn purchase_returns(world: &mut SniperWorld, expected: String) {
    match world.purchase_result.as_ref().expect("no purchase requested") {
        Ok(order) => assert_eq!(order.order_id, expected),
        Err(e) => panic!("purchase failed: {}", e),
    }
}

#[then(expr = "there are {int} pipeline log entries")]
async fn pipeline_entries(world: &mut SniperWorld, expected: usize) {
    let status = world.engine().status().await;
    let count = status
        .logs
        .iter()
        .filter(|entry| entry.category == LogCategory::Pipeline)
        .count();
    assert_eq!(count, expected, "logs: {:#?}", status.logs);
}

#[then(expr = "no pipeline log entry mentions {string}")]
async fn no_pipeline_entry_mentions(world: &mut SniperWorld, text: String) {
    let status = world.engine().status().await;
    assert!(!status
        .logs
        .iter()
        .any(|entry| entry.category == LogCategory::Pipeline && entry.message.contains(&text)));
}

#[then(expr = "the last pipeline log entry starts with {string}")]
async fn last_pipeline_entry(world: &mut SniperWorld, prefix: String) {
    let status = world.engine().status().await;
    let last = status
        .logs
        .iter()
        .rev()
        .find(|entry| entry.category == LogCategory::Pipeline)
        .expect("no pipeline log entries");
    assert!(last.message.starts_with(&prefix), "{}", last.message);
}
