//! Per-source breakpoint sync: serialize concurrent `setBreakpoints`
//! calls against one source, coalescing requests that arrive while a
//! sync is already in flight into a single extra pass rather than
//! running once per request (spec §4.4 "Per-source sync", spec §5
//! ordering guarantee).

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::error::Error;

#[derive(Default)]
pub struct SyncCoordinator {
    in_flight: Mutex<()>,
    dirty: AtomicBool,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `run` to completion. If another call to `run_coalesced`
    /// is already in flight for this coordinator, this call does not
    /// run `run` itself — it marks the in-flight call dirty and
    /// returns immediately, trusting the in-flight call to re-run
    /// once more before it finishes.
    pub async fn run_coalesced<F, Fut>(&self, mut run: F) -> Result<(), Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        let guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.dirty.store(true, Ordering::SeqCst);
                return Ok(());
            }
        };
        loop {
            self.dirty.store(false, Ordering::SeqCst);
            run().await?;
            if !self.dirty.load(Ordering::SeqCst) {
                break;
            }
        }
        drop(guard);
        Ok(())
    }
}
