//! Allocation accounting for paged storage.
//!
//! Every [`crate::PagedArray`] reports the bytes it reserves to the
//! [`AllocationTracker`] it was constructed with, and reports them again when
//! it is released or dropped. Trackers are explicit handles rather than
//! process-wide state so independent computations (and tests) never observe
//! each other's allocations.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::memory::format_bytes;

#[derive(Debug, Default)]
struct Counters {
    current: AtomicU64,
    peak: AtomicU64,
    allocations: AtomicU64,
}

/// Shared handle that records byte-count deltas for capacity planning.
///
/// Cloning the handle shares the underlying counters. The default handle is
/// [`AllocationTracker::empty`], which discards every record.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, PagedArray};
///
/// let tracker = AllocationTracker::new();
/// let array = PagedArray::<u64>::new(1_000, &tracker)?;
/// assert!(tracker.tracked_bytes() >= 8_000);
/// drop(array);
/// assert_eq!(tracker.tracked_bytes(), 0);
/// assert!(tracker.peak_bytes() >= 8_000);
/// # Ok::<(), commune_core::PagedArrayError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct AllocationTracker {
    counters: Option<Arc<Counters>>,
}

impl AllocationTracker {
    /// Creates a tracker that accumulates allocation records.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Some(Arc::new(Counters::default())),
        }
    }

    /// Creates a tracker that ignores every record.
    #[must_use]
    pub const fn empty() -> Self {
        Self { counters: None }
    }

    /// Returns `true` when records are being accumulated.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.counters.is_some()
    }

    /// Records that `bytes` were reserved.
    pub fn record_allocation(&self, bytes: u64) {
        let Some(counters) = &self.counters else {
            return;
        };
        let previous = counters.current.fetch_add(bytes, Ordering::AcqRel);
        counters
            .peak
            .fetch_max(previous.saturating_add(bytes), Ordering::AcqRel);
        counters.allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records that `bytes` were returned.
    ///
    /// Releases never drive the counter below zero.
    pub fn record_release(&self, bytes: u64) {
        let Some(counters) = &self.counters else {
            return;
        };
        // The closure always returns `Some`, so the update cannot fail.
        let _ = counters
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(bytes))
            });
    }

    /// Bytes currently reserved through this tracker.
    #[must_use]
    pub fn tracked_bytes(&self) -> u64 {
        self.counters
            .as_ref()
            .map_or(0, |counters| counters.current.load(Ordering::Acquire))
    }

    /// Highest value [`Self::tracked_bytes`] has reached.
    #[must_use]
    pub fn peak_bytes(&self) -> u64 {
        self.counters
            .as_ref()
            .map_or(0, |counters| counters.peak.load(Ordering::Acquire))
    }

    /// Number of allocations recorded so far.
    #[must_use]
    pub fn allocation_count(&self) -> u64 {
        self.counters
            .as_ref()
            .map_or(0, |counters| counters.allocations.load(Ordering::Relaxed))
    }

    /// Formats [`Self::tracked_bytes`] with binary units.
    #[must_use]
    pub fn human_readable(&self) -> String {
        format_bytes(self.tracked_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn empty_tracker_discards_records() {
        let tracker = AllocationTracker::empty();
        tracker.record_allocation(128);
        assert!(!tracker.is_enabled());
        assert_eq!(tracker.tracked_bytes(), 0);
        assert_eq!(tracker.peak_bytes(), 0);
        assert_eq!(tracker.allocation_count(), 0);
    }

    #[rstest]
    fn tracker_follows_allocations_and_releases() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(100);
        tracker.record_allocation(50);
        tracker.record_release(100);
        assert_eq!(tracker.tracked_bytes(), 50);
        assert_eq!(tracker.peak_bytes(), 150);
        assert_eq!(tracker.allocation_count(), 2);
    }

    #[rstest]
    fn release_saturates_at_zero() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(10);
        tracker.record_release(64);
        assert_eq!(tracker.tracked_bytes(), 0);
    }

    #[rstest]
    fn clones_share_counters() {
        let tracker = AllocationTracker::new();
        let clone = tracker.clone();
        clone.record_allocation(2048);
        assert_eq!(tracker.tracked_bytes(), 2048);
        assert_eq!(tracker.human_readable(), "2.0 KiB");
    }

    #[rstest]
    fn independent_trackers_do_not_interfere() {
        let left = AllocationTracker::new();
        let right = AllocationTracker::new();
        left.record_allocation(7);
        assert_eq!(right.tracked_bytes(), 0);
    }
}
