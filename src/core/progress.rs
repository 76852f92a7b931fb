//! Cooperative progress reporting and cancellation for filesystem walks
//!
//! The glob engine calls [`Progress::tick`] once per visited entry. Returning
//! `Err(Cancelled)` unwinds the whole match through ordinary `?` propagation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Error;

/// Signal raised from a progress callback to abort the current traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl From<Cancelled> for Error {
    fn from(_: Cancelled) -> Self {
        Error::Cancelled
    }
}

/// Callback invoked for every filesystem entry visited during matching
pub trait Progress {
    fn tick(&mut self) -> Result<(), Cancelled>;
}

impl<F> Progress for F
where
    F: FnMut() -> Result<(), Cancelled>,
{
    fn tick(&mut self) -> Result<(), Cancelled> {
        self()
    }
}

/// A progress callback that never cancels
pub fn no_progress() -> impl FnMut() -> Result<(), Cancelled> {
    || Ok(())
}

/// Shared flag that can be raised from another thread (e.g. a Ctrl+C handler)
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Progress for CancelFlag {
    fn tick(&mut self) -> Result<(), Cancelled> {
        self.check()
    }
}

/// Counts visited entries, logs every `interval` of them and honours a cancel flag
#[derive(Debug)]
pub struct ProgressCounter {
    visited: u64,
    interval: u64,
    cancel: CancelFlag,
}

impl ProgressCounter {
    pub fn new(interval: u64, cancel: CancelFlag) -> Self {
        Self {
            visited: 0,
            interval: interval.max(1),
            cancel,
        }
    }

    pub fn visited(&self) -> u64 {
        self.visited
    }
}

impl Progress for ProgressCounter {
    fn tick(&mut self) -> Result<(), Cancelled> {
        self.visited += 1;
        if self.visited % self.interval == 0 {
            tracing::debug!("Visited {} filesystem entries", self.visited);
        }
        self.cancel.check()
    }
}
