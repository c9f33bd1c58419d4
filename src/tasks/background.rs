//! Detached Work
//!
//! Revalidation and pruning run after the response has been handed back.
//! Their failures are logged here and never reach a caller.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

/// Fire-and-forget task set.
///
/// Finished tasks are reaped on every spawn so the set does not grow with
/// traffic; `drain` waits for everything still running.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    set: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    /// Creates an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the current runtime without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(result) = set.try_join_next() {
            log_outcome(result);
        }
        debug!("spawning background task: {}", label);
        set.spawn(task);
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn len(&self) -> usize {
        self.set.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until every task, including ones spawned meanwhile, has finished.
    ///
    /// Returns the number of tasks joined.
    pub async fn drain(&self) -> usize {
        let mut joined = 0;
        loop {
            let mut pending = {
                let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *set)
            };
            if pending.is_empty() {
                return joined;
            }
            while let Some(result) = pending.join_next().await {
                log_outcome(result);
                joined += 1;
            }
        }
    }
}

fn log_outcome(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            warn!("background task panicked: {}", e);
        } else {
            debug!("background task cancelled: {}", e);
        }
    }
}
