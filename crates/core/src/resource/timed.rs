use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SyncResult;

/// Lifecycle of the last operation run against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// Nothing attempted yet, or the resource was reset.
    #[default]
    NotStarted,
    /// An operation is in flight.
    Running,
    /// The last operation stored a fresh value.
    Succeeded,
    /// The last operation failed; any previous value is kept.
    Failed,
}

/// Why an operation declined to start. Skips never change any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The cached value is trustworthy and no refresh was forced.
    Fresh,
    /// A required input is missing.
    PreconditionUnmet(&'static str),
    /// Another operation on the same resource is still running.
    InFlight,
}

/// Point-in-time copy of a resource for observers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot<T> {
    /// Cached value, if any.
    pub value: Option<T>,
    /// Status of the last operation.
    pub status: ProcessStatus,
    /// Epoch millis of the last successful fetch, `0` when never fetched.
    pub last_fetch_ms: i64,
}

/// Thread-safe cache cell with a fetch timestamp and a single-flight guard.
///
/// Clones share the same cell.
pub struct TimedResource<T> {
    inner: Arc<RwLock<Inner<T>>>,
}

struct Inner<T> {
    value: Option<T>,
    last_fetch_ms: i64,
    status: ProcessStatus,
}

impl<T> Inner<T> {
    fn is_expired(&self, now: i64, ttl: i64) -> bool {
        now.saturating_sub(self.last_fetch_ms) > ttl
    }

    fn is_refresh_needed(&self, now: i64, ttl: i64) -> bool {
        !(self.status == ProcessStatus::Succeeded && !self.is_expired(now, ttl))
    }

    fn clear(&mut self) {
        self.value = None;
        self.last_fetch_ms = 0;
        self.status = ProcessStatus::NotStarted;
    }
}

impl<T> Clone for TimedResource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for TimedResource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimedResource<T> {
    /// Build an empty, never-fetched cell.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                value: None,
                last_fetch_ms: 0,
                status: ProcessStatus::NotStarted,
            })),
        }
    }

    /// Current process status.
    pub fn status(&self) -> ProcessStatus {
        self.inner.read().status
    }

    /// Epoch millis of the last successful fetch.
    pub fn last_fetch_ms(&self) -> i64 {
        self.inner.read().last_fetch_ms
    }

    /// Whether more than `ttl` millis passed since the last successful fetch.
    pub fn is_expired(&self, now: i64, ttl: i64) -> bool {
        self.inner.read().is_expired(now, ttl)
    }

    /// True unless the cell holds a successful, unexpired fetch.
    pub fn is_refresh_needed(&self, now: i64, ttl: i64) -> bool {
        self.inner.read().is_refresh_needed(now, ttl)
    }

    /// Clear value and timestamp. Does nothing while an operation is running.
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        if inner.status != ProcessStatus::Running {
            inner.clear();
        }
    }

    /// Mark the cell as running if nothing else is. Returns `false` when the
    /// caller must back off.
    pub fn begin_if_idle(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.status == ProcessStatus::Running {
            return false;
        }
        inner.status = ProcessStatus::Running;
        true
    }

    /// Freshness check and single-flight guard under one lock.
    pub fn begin_refresh(&self, force: bool, now: i64, ttl: i64) -> Result<(), SkipReason> {
        let mut inner = self.inner.write();
        if !force && !inner.is_refresh_needed(now, ttl) {
            return Err(SkipReason::Fresh);
        }
        if inner.status == ProcessStatus::Running {
            return Err(SkipReason::InFlight);
        }
        inner.status = ProcessStatus::Running;
        Ok(())
    }

    /// Finish the running operation. Success stores the value and stamps
    /// `now`; failure keeps whatever was cached before.
    ///
    /// Returns `false` (and changes nothing) if the cell was not running.
    pub fn complete(&self, result: SyncResult<T>, now: i64) -> bool {
        let mut inner = self.inner.write();
        if inner.status != ProcessStatus::Running {
            warn!("ignoring completion for a resource that is not running");
            return false;
        }
        match result {
            Ok(value) => {
                inner.value = Some(value);
                inner.last_fetch_ms = now;
                inner.status = ProcessStatus::Succeeded;
                true
            }
            Err(_) => {
                inner.status = ProcessStatus::Failed;
                false
            }
        }
    }

    /// Finish the running operation with an explicit status, leaving the
    /// value untouched.
    pub(crate) fn finish(&self, status: ProcessStatus) {
        let mut inner = self.inner.write();
        if inner.status == ProcessStatus::Running {
            inner.status = status;
        }
    }

    /// Finish the running operation by returning the cell to its pristine
    /// state.
    pub(crate) fn finish_cleared(&self) {
        self.inner.write().clear();
    }

    /// Swap the value while the owning operation holds the cell.
    pub(crate) fn replace_running(&self, value: Option<T>) {
        let mut inner = self.inner.write();
        if inner.status == ProcessStatus::Running {
            inner.value = value;
        }
    }

    /// Swap the value when no operation holds the cell. Returns whether the
    /// value was stored.
    pub(crate) fn replace_idle(&self, value: Option<T>) -> bool {
        let mut inner = self.inner.write();
        if inner.status == ProcessStatus::Running {
            return false;
        }
        inner.value = value;
        true
    }

    /// Guard that marks the running operation `Failed` if it is dropped
    /// before [`RunningGuard::disarm`], e.g. when the task panics.
    pub(crate) fn running_guard(&self) -> RunningGuard<T> {
        RunningGuard {
            cell: Some(self.clone()),
        }
    }

    /// Whether a value is cached.
    pub fn has_value(&self) -> bool {
        self.inner.read().value.is_some()
    }

    /// Borrow the cached value for the duration of `f`.
    pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.inner.read().value.as_ref())
    }
}

impl<T: Clone> TimedResource<T> {
    /// Clone of the cached value.
    pub fn value(&self) -> Option<T> {
        self.inner.read().value.clone()
    }

    /// Copy of value, status and timestamp taken under one lock.
    pub fn snapshot(&self) -> ResourceSnapshot<T> {
        let inner = self.inner.read();
        ResourceSnapshot {
            value: inner.value.clone(),
            status: inner.status,
            last_fetch_ms: inner.last_fetch_ms,
        }
    }
}

pub(crate) struct RunningGuard<T> {
    cell: Option<TimedResource<T>>,
}

impl<T> RunningGuard<T> {
    pub(crate) fn disarm(mut self) {
        self.cell = None;
    }
}

impl<T> Drop for RunningGuard<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            warn!("operation abandoned while running");
            cell.finish(ProcessStatus::Failed);
        }
    }
}
