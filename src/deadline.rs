//! Wall-clock bound for one optimization call.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::PlannerError;

/// Cooperative deadline checked between units of work.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiry, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.elapsed() >= limit)
    }

    pub fn check(&self) -> Result<(), PlannerError> {
        match self.limit {
            Some(limit) if self.elapsed() >= limit => Err(PlannerError::Timeout { limit }),
            _ => Ok(()),
        }
    }

    /// Runs `work` and returns its result, or `Timeout` once the limit passes.
    ///
    /// Unbounded deadlines run `work` on the calling thread. Otherwise `work`
    /// runs on a named worker thread; on expiry the worker is abandoned and
    /// whatever it eventually produces is dropped. A panic in the worker is
    /// resumed on the caller.
    pub fn run_bounded<T, F>(&self, name: &str, work: F) -> Result<T, PlannerError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, PlannerError> + Send + 'static,
    {
        let Some(limit) = self.limit else {
            return work();
        };
        self.check()?;

        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // The receiver is gone when the caller already timed out.
                let _ = tx.send(work());
            })
            .map_err(PlannerError::Worker)?;

        match rx.recv_timeout(self.remaining().unwrap_or_default()) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    worker = name,
                    limit_ms = limit.as_millis() as u64,
                    "time limit reached, abandoning worker"
                );
                Err(PlannerError::Timeout { limit })
            }
            Err(RecvTimeoutError::Disconnected) => match handle.join() {
                Err(panic) => std::panic::resume_unwind(panic),
                Ok(()) => Err(PlannerError::Timeout { limit }),
            },
        }
    }
}
