//! Paged arrays of atomic slots for state shared between workers.

use std::{
    fmt,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use rayon::prelude::*;

use crate::{error::PagedArrayError, tracker::AllocationTracker};

use super::{
    Element, PagedArray,
    layout::{PageGeometry, bytes_for, max_length_for},
};

type StorageResult<T> = core::result::Result<T, PagedArrayError>;

/// An atomic cell usable as a [`PagedAtomicArray`] slot.
pub trait AtomicSlot: Default + Send + Sync + 'static {
    /// Plain value held by the slot.
    type Value: Copy + PartialEq + Send + Sync;

    /// Loads the current value.
    fn load(&self, order: Ordering) -> Self::Value;

    /// Stores `value`.
    fn store(&self, value: Self::Value, order: Ordering);

    /// Replaces `current` with `new` if the slot still holds `current`.
    ///
    /// # Errors
    /// Returns the observed value when it differs from `current`.
    fn compare_exchange(
        &self,
        current: Self::Value,
        new: Self::Value,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self::Value, Self::Value>;
}

macro_rules! impl_atomic_slot {
    ($atomic:ty => $value:ty) => {
        impl AtomicSlot for $atomic {
            type Value = $value;

            fn load(&self, order: Ordering) -> $value {
                <$atomic>::load(self, order)
            }

            fn store(&self, value: $value, order: Ordering) {
                <$atomic>::store(self, value, order);
            }

            fn compare_exchange(
                &self,
                current: $value,
                new: $value,
                success: Ordering,
                failure: Ordering,
            ) -> Result<$value, $value> {
                <$atomic>::compare_exchange(self, current, new, success, failure)
            }
        }
    };
}

impl_atomic_slot!(AtomicUsize => usize);
impl_atomic_slot!(AtomicU64 => u64);

/// A double stored as its IEEE-754 bit pattern in an [`AtomicU64`].
#[derive(Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Creates a cell holding `value`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }
}

impl fmt::Debug for AtomicF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicF64")
            .field(&AtomicSlot::load(self, Ordering::Relaxed))
            .finish()
    }
}

impl AtomicSlot for AtomicF64 {
    type Value = f64;

    fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.0.load(order))
    }

    fn store(&self, value: f64, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }

    // Compares bit patterns, so `-0.0` and `0.0` are distinct.
    fn compare_exchange(
        &self,
        current: f64,
        new: f64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<f64, f64> {
        self.0
            .compare_exchange(current.to_bits(), new.to_bits(), success, failure)
            .map(f64::from_bits)
            .map_err(f64::from_bits)
    }
}

/// Fixed-length paged array of atomic slots.
///
/// Every operation takes `&self`, so workers on the rayon pool may share one
/// array. Loads use acquire ordering and stores release ordering; updates loop
/// on compare-and-swap until they succeed.
pub struct PagedAtomicArray<A> {
    length: usize,
    geometry: PageGeometry,
    pages: Option<Vec<Box<[A]>>>,
    reserved_bytes: u64,
    tracker: AllocationTracker,
}

impl<A: AtomicSlot> PagedAtomicArray<A> {
    /// Allocates `length` slots holding the slot type's default value.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::CapacityExceeded`] when `length` cannot be
    /// addressed for `A`.
    pub fn new(length: usize, tracker: &AllocationTracker) -> StorageResult<Self> {
        let limit = max_length_for::<A>();
        if length > limit {
            return Err(PagedArrayError::CapacityExceeded {
                requested: length,
                limit,
            });
        }
        let geometry = PageGeometry::for_element::<A>();
        let pages: Vec<Box<[A]>> = (0..geometry.page_count(length))
            .map(|page| {
                (0..geometry.page_length(page, length))
                    .map(|_| A::default())
                    .collect()
            })
            .collect();
        let reserved_bytes =
            bytes_for::<A>(length).saturating_add(bytes_for::<Box<[A]>>(pages.len()));
        tracker.record_allocation(reserved_bytes);
        Ok(Self {
            length,
            geometry,
            pages: Some(pages),
            reserved_bytes,
            tracker: tracker.clone(),
        })
    }

    /// Logical number of slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` when the array holds no slots.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn slot(&self, index: usize) -> StorageResult<&A> {
        let pages = self.pages.as_ref().ok_or(PagedArrayError::UseAfterRelease)?;
        let out_of_range = PagedArrayError::IndexOutOfRange {
            index,
            length: self.length,
        };
        if index >= self.length {
            return Err(out_of_range);
        }
        pages
            .get(self.geometry.page_index(index))
            .and_then(|page| page.get(self.geometry.index_in_page(index)))
            .ok_or(out_of_range)
    }

    /// Loads the value at `index`.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] or
    /// [`PagedArrayError::UseAfterRelease`].
    pub fn get(&self, index: usize) -> StorageResult<A::Value> {
        Ok(self.slot(index)?.load(Ordering::Acquire))
    }

    /// Stores `value` at `index`.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] or
    /// [`PagedArrayError::UseAfterRelease`].
    pub fn set(&self, index: usize, value: A::Value) -> StorageResult<()> {
        self.slot(index)?.store(value, Ordering::Release);
        Ok(())
    }

    /// Swaps `current` for `new` at `index` when the slot still holds
    /// `current`.
    ///
    /// The inner result is `Ok(previous)` on success and `Err(observed)` when
    /// another worker changed the slot first.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] or
    /// [`PagedArrayError::UseAfterRelease`].
    pub fn compare_exchange(
        &self,
        index: usize,
        current: A::Value,
        new: A::Value,
    ) -> StorageResult<Result<A::Value, A::Value>> {
        Ok(self
            .slot(index)?
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire))
    }

    /// Atomically replaces the value at `index` with `update(current)` and
    /// returns the previous value.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] or
    /// [`PagedArrayError::UseAfterRelease`].
    pub fn update(
        &self,
        index: usize,
        mut update: impl FnMut(A::Value) -> A::Value,
    ) -> StorageResult<A::Value> {
        let slot = self.slot(index)?;
        let mut current = slot.load(Ordering::Acquire);
        loop {
            match slot.compare_exchange(
                current,
                update(current),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => return Ok(previous),
                Err(observed) => current = observed,
            }
        }
    }

    /// Stores `generator(index)` into every slot using the rayon pool.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release.
    pub fn par_set_all<F>(&self, generator: F) -> StorageResult<()>
    where
        F: Fn(usize) -> A::Value + Sync,
    {
        let pages = self.pages.as_ref().ok_or(PagedArrayError::UseAfterRelease)?;
        let page_size = self.geometry.page_size();
        pages.par_iter().enumerate().for_each(|(page, slots)| {
            let start = page * page_size;
            for (offset, slot) in slots.iter().enumerate() {
                slot.store(generator(start + offset), Ordering::Relaxed);
            }
        });
        Ok(())
    }

    /// Returns the memory to the allocator and the tracker.
    pub fn release(&mut self) -> u64 {
        if self.pages.take().is_none() {
            return 0;
        }
        let released = std::mem::take(&mut self.reserved_bytes);
        self.tracker.record_release(released);
        released
    }
}

impl<A> PagedAtomicArray<A>
where
    A: AtomicSlot,
    A::Value: Element,
{
    /// Copies the current values into a plain [`PagedArray`].
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release, or any
    /// allocation failure of the destination.
    pub fn snapshot(&self, tracker: &AllocationTracker) -> StorageResult<PagedArray<A::Value>> {
        let mut copy = PagedArray::new(self.length, tracker)?;
        copy.try_set_all(|index| self.get(index))?;
        Ok(copy)
    }
}

impl<A> Drop for PagedAtomicArray<A> {
    fn drop(&mut self) {
        if self.pages.is_some() {
            self.tracker.record_release(self.reserved_bytes);
        }
    }
}

impl<A> fmt::Debug for PagedAtomicArray<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedAtomicArray")
            .field("length", &self.length)
            .field("released", &self.pages.is_none())
            .field("reserved_bytes", &self.reserved_bytes)
            .finish()
    }
}
