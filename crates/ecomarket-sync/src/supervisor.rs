//! Task supervision.
//!
//! Wraps a background task in a restart loop. A worker that returns or
//! panics is restarted after an exponential pause instead of silently
//! disappearing from the process.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use ecomarket_core::backoff_delay;

const RESTART_BASE: Duration = Duration::from_secs(1);

/// Cap on the restart backoff exponent (1s * 2^5 = 32s max pause).
const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Spawns `factory()` and restarts it whenever it finishes.
///
/// The factory is invoked once per incarnation, so each restart gets a
/// fresh future (and thus fresh connections).
pub fn spawn_supervised<F, Fut>(name: &'static str, factory: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut restarts: u32 = 0;
        loop {
            let incarnation = tokio::spawn(factory());
            match incarnation.await {
                Ok(()) => warn!(task = name, "supervised task exited"),
                Err(e) => warn!(task = name, error = %e, "supervised task panicked"),
            }
            let delay = backoff_delay(RESTART_BASE, restarts.min(MAX_BACKOFF_EXPONENT));
            restarts = restarts.saturating_add(1);
            info!(
                task = name,
                restarts,
                delay_secs = delay.as_secs(),
                "restarting supervised task"
            );
            tokio::time::sleep(delay).await;
        }
    })
}
