//! Background purge of expired key records

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::store::KeyStore;

/// Spawn a task that purges expired records every `interval`
pub fn spawn_expired_key_sweeper(store: KeyStore, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Starting expired key sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match store.purge_expired().await {
                Ok(0) => debug!("No expired keys to purge"),
                Ok(purged) => match store.count().await {
                    Ok(remaining) => info!(purged, remaining, "Purged expired keys"),
                    Err(_) => info!(purged, "Purged expired keys"),
                },
                Err(e) => error!("Failed to purge expired keys: {}", e),
            }
        }
    })
}
