//! Shared elapsed-time ticker.

use std::sync::Weak;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::store::{now_ms, ProcessingStore};

/// Ticks until the store has no running entries or has been dropped.
pub(crate) async fn run(store: Weak<ProcessingStore>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // skip immediate first tick

    loop {
        interval.tick().await;

        let Some(store) = store.upgrade() else {
            break;
        };

        if !store.tick_at(now_ms()) {
            log::debug!("No running entries, elapsed ticker stopped");
            break;
        }
    }
}
