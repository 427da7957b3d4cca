use proptest::{collection::vec, prelude::any, prop_assert_eq, proptest};
use rayon::prelude::*;
use rstest::{fixture, rstest};

use super::*;
use crate::test_utils::suite_proptest_config;

#[fixture]
fn tracker() -> AllocationTracker {
    AllocationTracker::new()
}

fn layouts(length: usize, tracker: &AllocationTracker) -> [PagedArray<u64>; 2] {
    [
        PagedArray::new_single(length, tracker).expect("single layout must allocate"),
        PagedArray::with_page_shift(length, 2, tracker).expect("paged layout must allocate"),
    ]
}

#[rstest]
fn new_picks_single_layout_for_small_lengths(tracker: AllocationTracker) {
    let array = PagedArray::<u32>::new(17, &tracker).expect("allocation must succeed");
    assert_eq!(array.layout(), Layout::Single);
    assert_eq!(array.len(), 17);
    assert!(!array.is_empty());
    assert!(array.iter().expect("live array").all(|value| value == 0));
}

#[rstest]
fn paged_layout_spans_remainder_page(tracker: AllocationTracker) {
    let mut array = PagedArray::<u64>::with_page_shift(10, 2, &tracker).expect("allocation");
    array.set_all(|index| index as u64).expect("live array");
    let pages: Vec<(usize, usize)> = array
        .pages()
        .expect("live array")
        .map(|(start, page)| (start, page.len()))
        .collect();
    assert_eq!(pages, vec![(0, 4), (4, 4), (8, 2)]);
    assert_eq!(array.get(9), Ok(9));
}

#[rstest]
fn bitwise_and_addition_agree_across_layouts(tracker: AllocationTracker) {
    for mut array in layouts(10, &tracker) {
        array.set(0, 0b1100).expect("in range");
        assert_eq!(array.or(0, 0b0011), Ok(0b1111));
        assert_eq!(array.and(0, 0b0101), Ok(0b0101));
        array.set(5, 40).expect("in range");
        assert_eq!(array.add_to(5, 2), Ok(42));
        assert_eq!(array.get(5), Ok(42));
    }
}

#[rstest]
#[case::single(Layout::Single)]
#[case::paged(Layout::Paged)]
fn out_of_range_access_is_rejected(tracker: AllocationTracker, #[case] layout: Layout) {
    let mut array = match layout {
        Layout::Single => PagedArray::<u8>::new_single(3, &tracker),
        Layout::Paged => PagedArray::<u8>::new_paged(3, &tracker),
    }
    .expect("allocation");
    let expected = PagedArrayError::IndexOutOfRange {
        index: 3,
        length: 3,
    };
    assert_eq!(array.get(3), Err(expected.clone()));
    assert_eq!(array.set(3, 1), Err(expected));
}

#[rstest]
fn single_layout_rejects_oversized_lengths(tracker: AllocationTracker) {
    let err = PagedArray::<u8>::new_single(MAX_SINGLE_LENGTH + 1, &tracker)
        .expect_err("oversized single block must fail");
    assert_eq!(
        err,
        PagedArrayError::CapacityExceeded {
            requested: MAX_SINGLE_LENGTH + 1,
            limit: MAX_SINGLE_LENGTH,
        }
    );
    assert_eq!(tracker.tracked_bytes(), 0);
}

#[rstest]
fn unaddressable_lengths_are_rejected(tracker: AllocationTracker) {
    let err = PagedArray::<u64>::new(usize::MAX, &tracker).expect_err("must not allocate");
    assert!(matches!(err, PagedArrayError::CapacityExceeded { .. }));
}

#[rstest]
fn release_returns_bytes_and_poisons_access(tracker: AllocationTracker) {
    let mut array = PagedArray::<u64>::new(100, &tracker).expect("allocation");
    let reserved = array.size_in_bytes();
    assert_eq!(reserved, 800);
    assert_eq!(tracker.tracked_bytes(), 800);
    assert_eq!(array.release(), 800);
    assert_eq!(array.release(), 0);
    assert_eq!(tracker.tracked_bytes(), 0);
    assert!(array.is_released());
    assert_eq!(array.get(0), Err(PagedArrayError::UseAfterRelease));
    assert_eq!(array.fill(1), Err(PagedArrayError::UseAfterRelease));
    drop(array);
    assert_eq!(tracker.tracked_bytes(), 0);
}

#[rstest]
fn paged_reservation_includes_page_table(tracker: AllocationTracker) {
    let array = PagedArray::<u64>::with_page_shift(9, 2, &tracker).expect("allocation");
    let page_table = 3 * std::mem::size_of::<Box<[u64]>>() as u64;
    assert_eq!(array.size_in_bytes(), 72 + page_table);
    assert_eq!(tracker.tracked_bytes(), array.size_in_bytes());
}

#[rstest]
fn memory_estimation_matches_single_allocation(tracker: AllocationTracker) {
    let array = PagedArray::<u32>::new(1_000, &tracker).expect("allocation");
    assert_eq!(PagedArray::<u32>::memory_estimation(1_000), array.size_in_bytes());
    assert!(
        PagedArray::<u32>::memory_estimation(MAX_SINGLE_LENGTH + 1)
            > PagedArray::<u32>::memory_estimation(MAX_SINGLE_LENGTH)
    );
}

#[rstest]
fn copy_to_resets_longer_destination_tail(tracker: AllocationTracker) {
    let mut source = PagedArray::<u64>::with_page_shift(5, 1, &tracker).expect("allocation");
    source.set_all(|index| index as u64 + 1).expect("live");
    let mut destination = PagedArray::<u64>::new(7, &tracker).expect("allocation");
    destination.fill(9).expect("live");
    source.copy_to(&mut destination).expect("destination is long enough");
    assert_eq!(destination.to_vec(), Ok(vec![1, 2, 3, 4, 5, 0, 0]));

    let mut short = PagedArray::<u64>::new(2, &tracker).expect("allocation");
    assert_eq!(
        source.copy_to(&mut short),
        Err(PagedArrayError::LengthMismatch {
            source_length: 5,
            destination: 2,
        })
    );
}

#[rstest]
fn try_set_all_stops_at_first_error(tracker: AllocationTracker) {
    let mut array = PagedArray::<u32>::new(6, &tracker).expect("allocation");
    let outcome = array.try_set_all(|index| {
        if index == 4 {
            Err(PagedArrayError::UseAfterRelease)
        } else {
            Ok(7)
        }
    });
    assert_eq!(outcome, Err(PagedArrayError::UseAfterRelease));
    assert_eq!(array.to_vec(), Ok(vec![7, 7, 7, 7, 0, 0]));
}

#[rstest]
fn atomic_array_updates_from_many_workers(tracker: AllocationTracker) {
    let counters = PagedAtomicArray::<std::sync::atomic::AtomicU64>::new(3, &tracker)
        .expect("allocation");
    (0..1_000_usize).into_par_iter().for_each(|step| {
        counters
            .update(step % 3, |value| value + 1)
            .expect("index in range");
    });
    assert_eq!(counters.get(0), Ok(334));
    assert_eq!(counters.get(1), Ok(333));
    assert_eq!(counters.get(2), Ok(333));
}

#[rstest]
fn atomic_doubles_accumulate_and_snapshot(tracker: AllocationTracker) {
    let totals = PagedAtomicArray::<AtomicF64>::new(2, &tracker).expect("allocation");
    totals.par_set_all(|index| index as f64 * 0.5).expect("live");
    totals.update(1, |value| value + 1.5).expect("in range");
    assert_eq!(totals.compare_exchange(0, 0.0, 2.0), Ok(Ok(0.0)));
    assert_eq!(totals.compare_exchange(0, 0.0, 3.0), Ok(Err(2.0)));
    let snapshot = totals.snapshot(&tracker).expect("snapshot");
    assert_eq!(snapshot.to_vec(), Ok(vec![2.0, 2.0]));
}

#[rstest]
fn released_atomic_array_rejects_access(tracker: AllocationTracker) {
    let mut ids = PagedAtomicArray::<std::sync::atomic::AtomicUsize>::new(4, &tracker)
        .expect("allocation");
    assert!(tracker.tracked_bytes() >= 32);
    assert!(ids.release() >= 32);
    assert_eq!(tracker.tracked_bytes(), 0);
    assert_eq!(ids.get(0), Err(PagedArrayError::UseAfterRelease));
}

proptest! {
    #![proptest_config(suite_proptest_config(64))]

    #[test]
    fn layouts_read_back_identical_values(
        values in vec(any::<u64>(), 0..200),
        shift in 1_u32..6,
    ) {
        let tracker = AllocationTracker::new();
        let mut single = PagedArray::new_single(values.len(), &tracker)
            .expect("single layout must allocate");
        let mut paged = PagedArray::with_page_shift(values.len(), shift, &tracker)
            .expect("paged layout must allocate");
        for (index, value) in values.iter().enumerate() {
            single.set(index, *value).expect("in range");
            paged.set(index, *value).expect("in range");
        }
        for index in 0..values.len() {
            prop_assert_eq!(single.get(index), paged.get(index));
        }
        prop_assert_eq!(paged.to_vec().expect("fits one block"), values);
    }

    #[test]
    fn par_set_all_matches_sequential_fill(length in 0_usize..300, shift in 1_u32..5) {
        let tracker = AllocationTracker::new();
        let mut sequential = PagedArray::<usize>::with_page_shift(length, shift, &tracker)
            .expect("allocation");
        let mut parallel = PagedArray::<usize>::new(length, &tracker).expect("allocation");
        sequential.set_all(|index| index * 3).expect("live");
        parallel.par_set_all(|index| index * 3).expect("live");
        prop_assert_eq!(sequential.to_vec(), parallel.to_vec());
    }
}
