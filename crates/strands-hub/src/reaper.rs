//! Background expiry of idle identities.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::registry::Registry;

/// Shortest sweep period; `tokio::time::interval` rejects zero.
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(10);

/// Every `every`, drop identities idle for longer than `ttl`.
pub fn spawn_reaper(registry: Arc<Registry>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_REAP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let (reaped, remaining) =
                registry.with(|dir| (dir.reap_idle(ttl, Instant::now()), dir.identity_count()));
            if reaped > 0 {
                info!("Reaped {reaped} idle identities, {remaining} remain");
            }
        }
    })
}
