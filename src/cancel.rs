//! Epoch-based cancellation for in-flight hydrations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counter owned by a gallery. Bumping it cancels every token issued
/// before the bump.
#[derive(Debug, Clone, Default)]
pub struct Epoch(Arc<AtomicU64>);

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token tied to the current epoch.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            epoch: Arc::clone(&self.0),
            issued: self.0.load(Ordering::SeqCst),
        }
    }

    /// Advance the epoch, cancelling all outstanding tokens.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle checked by long-running work between steps.
#[derive(Debug, Clone)]
pub struct CancelToken {
    epoch: Arc<AtomicU64>,
    issued: u64,
}

impl CancelToken {
    /// A token that can never be cancelled.
    pub fn never() -> Self {
        Self {
            epoch: Arc::new(AtomicU64::new(0)),
            issued: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) != self.issued
    }
}
