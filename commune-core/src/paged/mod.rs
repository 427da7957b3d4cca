//! Paged large-array storage.
//!
//! [`PagedArray`] presents a fixed-length, index-addressable sequence whose
//! physical layout is either one contiguous block or a list of power-of-two
//! pages plus a remainder page. The layout is chosen once at construction and
//! never changes, so algorithm code is written once and scales from test
//! graphs to arrays longer than a single allocation should be.
//!
//! [`PagedAtomicArray`] is the concurrent counterpart used where workers share
//! per-node state within a pass.

mod atomic;
mod layout;

use std::{
    fmt,
    ops::{Add, BitAnd, BitOr},
};

use rayon::prelude::*;

use crate::{error::PagedArrayError, tracker::AllocationTracker};

pub use self::atomic::{AtomicF64, AtomicSlot, PagedAtomicArray};
pub use self::layout::MAX_SINGLE_LENGTH;

use self::layout::{PageGeometry, bytes_for, max_length_for};

type StorageResult<T> = core::result::Result<T, PagedArrayError>;

/// Element types storable in a [`PagedArray`].
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Element for T {}

/// Physical layout selected for a [`PagedArray`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Layout {
    /// One contiguous block.
    Single,
    /// Fixed-size pages plus a remainder page.
    Paged,
}

enum Storage<T> {
    Single(Box<[T]>),
    Paged(Vec<Box<[T]>>),
    Released,
}

/// Fixed-length array backed by either a single block or pages.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, Layout, PagedArray};
///
/// let tracker = AllocationTracker::new();
/// let mut single = PagedArray::<u64>::new_single(10, &tracker)?;
/// let mut paged = PagedArray::<u64>::new_paged(10, &tracker)?;
/// for index in 0..10 {
///     single.set(index, index as u64 * 3)?;
///     paged.set(index, index as u64 * 3)?;
/// }
/// assert_eq!(single.layout(), Layout::Single);
/// assert_eq!(paged.layout(), Layout::Paged);
/// assert_eq!(single.to_vec()?, paged.to_vec()?);
/// # Ok::<(), commune_core::PagedArrayError>(())
/// ```
pub struct PagedArray<T> {
    length: usize,
    geometry: PageGeometry,
    storage: Storage<T>,
    reserved_bytes: u64,
    tracker: AllocationTracker,
}

impl<T: Element> PagedArray<T> {
    /// Allocates `length` default-initialised elements, choosing the single
    /// layout when `length` fits [`MAX_SINGLE_LENGTH`] and pages otherwise.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::CapacityExceeded`] when `length` cannot be
    /// addressed for `T`.
    pub fn new(length: usize, tracker: &AllocationTracker) -> StorageResult<Self> {
        if length <= MAX_SINGLE_LENGTH {
            Self::new_single(length, tracker)
        } else {
            Self::new_paged(length, tracker)
        }
    }

    /// Allocates a single contiguous block.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::CapacityExceeded`] when `length` exceeds
    /// [`MAX_SINGLE_LENGTH`] or the addressable limit for `T`.
    pub fn new_single(length: usize, tracker: &AllocationTracker) -> StorageResult<Self> {
        let limit = MAX_SINGLE_LENGTH.min(max_length_for::<T>());
        if length > limit {
            return Err(PagedArrayError::CapacityExceeded {
                requested: length,
                limit,
            });
        }
        let block = vec![T::default(); length].into_boxed_slice();
        Ok(Self::with_storage(
            length,
            PageGeometry::for_element::<T>(),
            Storage::Single(block),
            tracker,
        ))
    }

    /// Allocates pages sized for roughly 32 KiB each.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::CapacityExceeded`] when `length` exceeds the
    /// addressable limit for `T`.
    pub fn new_paged(length: usize, tracker: &AllocationTracker) -> StorageResult<Self> {
        Self::paged_with_geometry(length, PageGeometry::for_element::<T>(), tracker)
    }

    /// Allocates pages of `1 << page_shift` elements.
    ///
    /// The shift is clamped to `1..=30`. Small shifts are mostly useful to
    /// exercise page boundaries with short arrays.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::CapacityExceeded`] when `length` exceeds the
    /// addressable limit for `T`.
    pub fn with_page_shift(
        length: usize,
        page_shift: u32,
        tracker: &AllocationTracker,
    ) -> StorageResult<Self> {
        Self::paged_with_geometry(length, PageGeometry::with_shift(page_shift), tracker)
    }

    fn paged_with_geometry(
        length: usize,
        geometry: PageGeometry,
        tracker: &AllocationTracker,
    ) -> StorageResult<Self> {
        let limit = max_length_for::<T>();
        if length > limit {
            return Err(PagedArrayError::CapacityExceeded {
                requested: length,
                limit,
            });
        }
        let pages = (0..geometry.page_count(length))
            .map(|page| vec![T::default(); geometry.page_length(page, length)].into_boxed_slice())
            .collect();
        Ok(Self::with_storage(
            length,
            geometry,
            Storage::Paged(pages),
            tracker,
        ))
    }

    fn with_storage(
        length: usize,
        geometry: PageGeometry,
        storage: Storage<T>,
        tracker: &AllocationTracker,
    ) -> Self {
        let reserved_bytes = match &storage {
            Storage::Single(_) => bytes_for::<T>(length),
            Storage::Paged(pages) => paged_bytes::<T>(length, pages.len()),
            Storage::Released => 0,
        };
        tracker.record_allocation(reserved_bytes);
        Self {
            length,
            geometry,
            storage,
            reserved_bytes,
            tracker: tracker.clone(),
        }
    }

    /// Bytes that [`Self::new`] would reserve for `length` elements.
    #[must_use]
    pub fn memory_estimation(length: usize) -> u64 {
        if length <= MAX_SINGLE_LENGTH {
            bytes_for::<T>(length)
        } else {
            let pages = PageGeometry::for_element::<T>().page_count(length);
            paged_bytes::<T>(length, pages)
        }
    }

    /// Logical number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` when the array holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Physical layout chosen at construction.
    #[must_use]
    pub const fn layout(&self) -> Layout {
        match self.storage {
            Storage::Single(_) => Layout::Single,
            Storage::Paged(_) | Storage::Released => Layout::Paged,
        }
    }

    /// Returns `true` once [`Self::release`] has run.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        matches!(self.storage, Storage::Released)
    }

    /// Bytes reserved by this array, zero after release.
    #[must_use]
    pub const fn size_in_bytes(&self) -> u64 {
        self.reserved_bytes
    }

    fn check(&self, index: usize) -> StorageResult<()> {
        if self.is_released() {
            return Err(PagedArrayError::UseAfterRelease);
        }
        if index >= self.length {
            return Err(PagedArrayError::IndexOutOfRange {
                index,
                length: self.length,
            });
        }
        Ok(())
    }

    fn slot(&self, index: usize) -> StorageResult<&T> {
        self.check(index)?;
        let slot = match &self.storage {
            Storage::Single(block) => block.get(index),
            Storage::Paged(pages) => pages
                .get(self.geometry.page_index(index))
                .and_then(|page| page.get(self.geometry.index_in_page(index))),
            Storage::Released => None,
        };
        slot.ok_or(PagedArrayError::IndexOutOfRange {
            index,
            length: self.length,
        })
    }

    fn slot_mut(&mut self, index: usize) -> StorageResult<&mut T> {
        self.check(index)?;
        let geometry = self.geometry;
        let slot = match &mut self.storage {
            Storage::Single(block) => block.get_mut(index),
            Storage::Paged(pages) => pages
                .get_mut(geometry.page_index(index))
                .and_then(|page| page.get_mut(geometry.index_in_page(index))),
            Storage::Released => None,
        };
        slot.ok_or(PagedArrayError::IndexOutOfRange {
            index,
            length: self.length,
        })
    }

    /// Reads the element at `index`.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for `index >= len()` and
    /// [`PagedArrayError::UseAfterRelease`] after release.
    pub fn get(&self, index: usize) -> StorageResult<T> {
        self.slot(index).copied()
    }

    /// Writes `value` at `index`.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for `index >= len()` and
    /// [`PagedArrayError::UseAfterRelease`] after release.
    pub fn set(&mut self, index: usize, value: T) -> StorageResult<()> {
        *self.slot_mut(index)? = value;
        Ok(())
    }

    /// Replaces the element at `index` with `update(current)` and returns the
    /// new value.
    ///
    /// # Errors
    /// Propagates the same failures as [`Self::get`].
    pub fn update(&mut self, index: usize, update: impl FnOnce(T) -> T) -> StorageResult<T> {
        let slot = self.slot_mut(index)?;
        *slot = update(*slot);
        Ok(*slot)
    }

    /// Writes `value` into every slot.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release.
    pub fn fill(&mut self, value: T) -> StorageResult<()> {
        for (_, page) in self.pages_mut()? {
            page.fill(value);
        }
        Ok(())
    }

    /// Writes `generator(index)` into every slot, in index order.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release.
    pub fn set_all(&mut self, mut generator: impl FnMut(usize) -> T) -> StorageResult<()> {
        for (start, page) in self.pages_mut()? {
            for (offset, slot) in page.iter_mut().enumerate() {
                *slot = generator(start + offset);
            }
        }
        Ok(())
    }

    /// Fallible variant of [`Self::set_all`] that stops at the first error.
    ///
    /// # Errors
    /// Returns the first error produced by `generator`, or
    /// [`PagedArrayError::UseAfterRelease`] after release.
    pub fn try_set_all<E>(
        &mut self,
        mut generator: impl FnMut(usize) -> Result<T, E>,
    ) -> Result<(), E>
    where
        E: From<PagedArrayError>,
    {
        for (start, page) in self.pages_mut()? {
            for (offset, slot) in page.iter_mut().enumerate() {
                *slot = generator(start + offset)?;
            }
        }
        Ok(())
    }

    /// Writes `generator(index)` into every slot using the rayon pool.
    ///
    /// Workers own disjoint pages, so no two workers touch the same slot.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release.
    pub fn par_set_all<F>(&mut self, generator: F) -> StorageResult<()>
    where
        F: Fn(usize) -> T + Sync,
    {
        self.pages_mut()?
            .into_par_iter()
            .for_each(|(start, page)| {
                for (offset, slot) in page.iter_mut().enumerate() {
                    *slot = generator(start + offset);
                }
            });
        Ok(())
    }

    /// Splits the storage into disjoint mutable chunks, each tagged with the
    /// index of its first element.
    ///
    /// A single-layout array is chunked at the page size so callers can hand
    /// chunks to separate workers.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release.
    pub fn pages_mut(&mut self) -> StorageResult<Vec<(usize, &mut [T])>> {
        let page_size = self.geometry.page_size();
        match &mut self.storage {
            Storage::Single(block) => Ok(block
                .chunks_mut(page_size)
                .enumerate()
                .map(|(page, chunk)| (page * page_size, chunk))
                .collect()),
            Storage::Paged(pages) => Ok(pages
                .iter_mut()
                .enumerate()
                .map(|(page, chunk)| (page * page_size, &mut chunk[..]))
                .collect()),
            Storage::Released => Err(PagedArrayError::UseAfterRelease),
        }
    }

    /// Iterates the storage page by page, yielding the index of each page's
    /// first element alongside its contents.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release.
    pub fn pages(&self) -> StorageResult<Pages<'_, T>> {
        let inner = match &self.storage {
            Storage::Single(block) => PagesInner::Single(block.chunks(self.geometry.page_size())),
            Storage::Paged(pages) => PagesInner::Paged(pages.iter()),
            Storage::Released => return Err(PagedArrayError::UseAfterRelease),
        };
        Ok(Pages { inner, next: 0 })
    }

    /// Iterates every element in index order.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UseAfterRelease`] after release.
    pub fn iter(&self) -> StorageResult<impl Iterator<Item = T> + '_> {
        Ok(self
            .pages()?
            .flat_map(|(_, page)| page.iter().copied()))
    }

    /// Copies the contents into a plain vector.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::UnsupportedForPagedLayout`] when the length
    /// exceeds [`MAX_SINGLE_LENGTH`], and
    /// [`PagedArrayError::UseAfterRelease`] after release.
    pub fn to_vec(&self) -> StorageResult<Vec<T>> {
        if self.is_released() {
            return Err(PagedArrayError::UseAfterRelease);
        }
        if self.length > MAX_SINGLE_LENGTH {
            return Err(PagedArrayError::UnsupportedForPagedLayout {
                length: self.length,
                limit: MAX_SINGLE_LENGTH,
            });
        }
        let mut values = Vec::with_capacity(self.length);
        for (_, page) in self.pages()? {
            values.extend_from_slice(page);
        }
        Ok(values)
    }

    /// Copies every element into `destination`, resetting any trailing slots
    /// of a longer destination to the default value.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::LengthMismatch`] when `destination` is
    /// shorter than `self`, and [`PagedArrayError::UseAfterRelease`] when
    /// either array was released.
    pub fn copy_to(&self, destination: &mut Self) -> StorageResult<()> {
        if destination.length < self.length {
            return Err(PagedArrayError::LengthMismatch {
                source_length: self.length,
                destination: destination.length,
            });
        }
        let mut values = self.iter()?;
        destination.set_all(|_| values.next().unwrap_or_default())
    }

    /// Returns the reserved memory to the allocator and the tracker.
    ///
    /// Every later operation fails with [`PagedArrayError::UseAfterRelease`].
    /// Returns the number of bytes released, zero when already released.
    pub fn release(&mut self) -> u64 {
        if self.is_released() {
            return 0;
        }
        self.storage = Storage::Released;
        let released = std::mem::take(&mut self.reserved_bytes);
        self.tracker.record_release(released);
        released
    }
}

impl<T: Element + Add<Output = T>> PagedArray<T> {
    /// Adds `delta` to the element at `index`.
    ///
    /// Not safe for concurrent mutation of the same index.
    ///
    /// # Errors
    /// Propagates the same failures as [`Self::get`].
    pub fn add_to(&mut self, index: usize, delta: T) -> StorageResult<T> {
        self.update(index, |value| value + delta)
    }
}

impl<T: Element + BitOr<Output = T>> PagedArray<T> {
    /// Applies a bitwise OR of `mask` to the element at `index`.
    ///
    /// # Errors
    /// Propagates the same failures as [`Self::get`].
    pub fn or(&mut self, index: usize, mask: T) -> StorageResult<T> {
        self.update(index, |value| value | mask)
    }
}

impl<T: Element + BitAnd<Output = T>> PagedArray<T> {
    /// Applies a bitwise AND of `mask` to the element at `index`.
    ///
    /// # Errors
    /// Propagates the same failures as [`Self::get`].
    pub fn and(&mut self, index: usize, mask: T) -> StorageResult<T> {
        self.update(index, |value| value & mask)
    }
}

impl<T> Drop for PagedArray<T> {
    fn drop(&mut self) {
        if !matches!(self.storage, Storage::Released) {
            self.tracker.record_release(self.reserved_bytes);
        }
    }
}

impl<T> fmt::Debug for PagedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = match self.storage {
            Storage::Single(_) => "single",
            Storage::Paged(_) => "paged",
            Storage::Released => "released",
        };
        f.debug_struct("PagedArray")
            .field("length", &self.length)
            .field("layout", &layout)
            .field("page_shift", &self.geometry.shift())
            .field("reserved_bytes", &self.reserved_bytes)
            .finish()
    }
}

enum PagesInner<'a, T> {
    Single(std::slice::Chunks<'a, T>),
    Paged(std::slice::Iter<'a, Box<[T]>>),
}

/// Iterator over the pages of a [`PagedArray`].
pub struct Pages<'a, T> {
    inner: PagesInner<'a, T>,
    next: usize,
}

impl<'a, T> Iterator for Pages<'a, T> {
    type Item = (usize, &'a [T]);

    fn next(&mut self) -> Option<Self::Item> {
        let page: &'a [T] = match &mut self.inner {
            PagesInner::Single(chunks) => chunks.next()?,
            PagesInner::Paged(pages) => pages.next().map(|page| &**page)?,
        };
        let start = self.next;
        self.next += page.len();
        Some((start, page))
    }
}

fn paged_bytes<T>(length: usize, pages: usize) -> u64 {
    bytes_for::<T>(length).saturating_add(bytes_for::<Box<[T]>>(pages))
}

#[cfg(test)]
mod tests;
