//! Page geometry shared by the paged array types.

use std::mem::size_of;

/// Target size of one page in bytes.
pub(crate) const PAGE_SIZE_IN_BYTES: usize = 32 * 1024;

/// Largest element count stored in a single contiguous block.
pub const MAX_SINGLE_LENGTH: usize = 1 << 28;

/// Smallest page shift accepted by [`PageGeometry::with_shift`].
pub(crate) const MIN_PAGE_SHIFT: u32 = 1;

/// Largest page shift accepted by [`PageGeometry::with_shift`].
pub(crate) const MAX_PAGE_SHIFT: u32 = 30;

/// Power-of-two page size expressed as a shift and a mask.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct PageGeometry {
    shift: u32,
    mask: usize,
}

impl PageGeometry {
    /// Geometry whose pages hold roughly [`PAGE_SIZE_IN_BYTES`] of `T`.
    pub(crate) fn for_element<T>() -> Self {
        let elements = (PAGE_SIZE_IN_BYTES / size_of::<T>().max(1)).max(2);
        Self::with_shift(elements.ilog2())
    }

    /// Geometry with `1 << shift` elements per page, clamped to the supported
    /// range.
    pub(crate) const fn with_shift(shift: u32) -> Self {
        let shift = if shift < MIN_PAGE_SHIFT {
            MIN_PAGE_SHIFT
        } else if shift > MAX_PAGE_SHIFT {
            MAX_PAGE_SHIFT
        } else {
            shift
        };
        Self {
            shift,
            mask: (1_usize << shift) - 1,
        }
    }

    pub(crate) const fn shift(self) -> u32 {
        self.shift
    }

    pub(crate) const fn page_size(self) -> usize {
        self.mask + 1
    }

    pub(crate) const fn page_index(self, index: usize) -> usize {
        index >> self.shift
    }

    pub(crate) const fn index_in_page(self, index: usize) -> usize {
        index & self.mask
    }

    /// Number of pages needed for `length` elements.
    pub(crate) const fn page_count(self, length: usize) -> usize {
        if length == 0 {
            0
        } else {
            ((length - 1) >> self.shift) + 1
        }
    }

    /// Number of elements held by page `page` of an array of `length`.
    pub(crate) const fn page_length(self, page: usize, length: usize) -> usize {
        let start = page << self.shift;
        let remaining = length.saturating_sub(start);
        if remaining < self.page_size() {
            remaining
        } else {
            self.page_size()
        }
    }
}

/// Largest element count of `T` that the address space can hold.
pub(crate) const fn max_length_for<T>() -> usize {
    let element = size_of::<T>();
    let element = if element == 0 { 1 } else { element };
    isize::MAX as usize / element
}

/// Bytes occupied by `length` elements of `T`, saturating on overflow.
pub(crate) const fn bytes_for<T>(length: usize) -> u64 {
    (length as u64).saturating_mul(size_of::<T>() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::u8(PageGeometry::for_element::<u8>(), 32 * 1024)]
    #[case::u64(PageGeometry::for_element::<u64>(), 4096)]
    #[case::triple(PageGeometry::for_element::<[u32; 3]>(), 2048)]
    fn page_size_tracks_element_size(#[case] geometry: PageGeometry, #[case] expected: usize) {
        assert_eq!(geometry.page_size(), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(4, 1)]
    #[case(5, 2)]
    #[case(9, 3)]
    fn page_count_rounds_up(#[case] length: usize, #[case] expected: usize) {
        assert_eq!(PageGeometry::with_shift(2).page_count(length), expected);
    }

    #[rstest]
    fn index_decomposes_into_page_and_offset() {
        let geometry = PageGeometry::with_shift(3);
        assert_eq!(geometry.page_index(19), 2);
        assert_eq!(geometry.index_in_page(19), 3);
        assert_eq!(geometry.page_length(2, 19), 3);
        assert_eq!(geometry.page_length(0, 19), 8);
    }

    #[rstest]
    #[case::too_small(0, MIN_PAGE_SHIFT)]
    #[case::too_large(63, MAX_PAGE_SHIFT)]
    fn shift_is_clamped(#[case] requested: u32, #[case] expected: u32) {
        assert_eq!(PageGeometry::with_shift(requested).shift(), expected);
    }
}
