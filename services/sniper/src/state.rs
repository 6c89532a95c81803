//! Shared monitoring state and the bounded activity log

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::inventory::Availability;

/// Which part of the engine wrote a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Lifecycle and purchase-trigger notes
    Monitor,
    /// One entry per completed availability check
    Check,
    /// One entry per executed purchase step
    Pipeline,
}

/// A single audit log line. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp_epoch_ms: u64,
    pub message: String,
    pub category: LogCategory,
}

/// How a completed check moved the availability state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTransition {
    /// false -> true
    BecameAvailable,
    /// true -> true
    StillAvailable,
    /// any -> false
    Unavailable,
    /// The check failed; availability kept its previous value
    Failed,
}

/// Immutable copy of the monitoring state handed to readers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_available: bool,
    pub last_checked: Option<u64>,
    pub check_count: u64,
    pub running: bool,
    pub logs: Vec<LogEntry>,
}

/// Observed state of one monitoring session
#[derive(Debug)]
pub struct SharedState {
    /// Bumped on every reset; writers tagged with an older id are stale
    pub session_id: u64,
    pub is_available: bool,
    pub last_checked_epoch_ms: Option<u64>,
    pub check_count: u64,
    pub logs: VecDeque<LogEntry>,
    pub log_capacity: usize,
}

impl SharedState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            session_id: 0,
            is_available: false,
            last_checked_epoch_ms: None,
            check_count: 0,
            logs: VecDeque::with_capacity(log_capacity.min(1024)),
            log_capacity: log_capacity.max(1),
        }
    }

    /// Clear everything for a new session
    pub fn reset(&mut self) {
        self.session_id = self.session_id.wrapping_add(1);
        self.is_available = false;
        self.last_checked_epoch_ms = None;
        self.check_count = 0;
        self.logs.clear();
    }

    /// Append a log entry, evicting the oldest beyond capacity
    pub fn push_log(&mut self, category: LogCategory, message: impl Into<String>) {
        if self.logs.len() >= self.log_capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            timestamp_epoch_ms: current_epoch_ms(),
            message: message.into(),
            category,
        });
    }

    /// Commit one completed check: count, timestamp, availability and its
    /// log line change together.
    pub fn record_check(
        &mut self,
        outcome: &crate::Result<Availability>,
        checked_at_ms: u64,
    ) -> CheckTransition {
        self.check_count += 1;
        self.last_checked_epoch_ms = Some(checked_at_ms);

        let availability = match outcome {
            Ok(availability) => availability,
            Err(e) => {
                self.push_log(LogCategory::Check, format!("Error during check: {}", e));
                return CheckTransition::Failed;
            }
        };

        let was_available = self.is_available;
        self.is_available = availability.available;

        match (was_available, availability.available) {
            (false, true) => {
                self.push_log(
                    LogCategory::Check,
                    format!(
                        "Server {} available in datacenter {}",
                        availability.fqn, availability.datacenter
                    ),
                );
                CheckTransition::BecameAvailable
            }
            (true, true) => {
                self.push_log(
                    LogCategory::Check,
                    format!(
                        "Server {} still available in datacenter {}",
                        availability.fqn, availability.datacenter
                    ),
                );
                CheckTransition::StillAvailable
            }
            (_, false) => {
                self.push_log(LogCategory::Check, "Server not available at this time");
                CheckTransition::Unavailable
            }
        }
    }

    /// Copy the current state; `running` comes from the engine's run state
    pub fn snapshot(&self, running: bool) -> StatusSnapshot {
        StatusSnapshot {
            is_available: self.is_available,
            last_checked: self.last_checked_epoch_ms,
            check_count: self.check_count,
            running,
            logs: self.logs.iter().cloned().collect(),
        }
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(log_capacity: usize) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(log_capacity)))
}

pub fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
