//! Cooperative cancellation for long-running computations.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag polled by algorithms at pass and level boundaries.
///
/// Clones observe the same flag, so a caller keeps one clone and hands
/// another to the running computation.
///
/// # Examples
/// ```
/// use commune_core::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker = token.clone();
/// assert!(!worker.is_cancelled());
/// token.cancel();
/// assert!(worker.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` once [`Self::cancel`] has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
