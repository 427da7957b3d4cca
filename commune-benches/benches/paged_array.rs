//! Paged array access benchmarks.
//!
//! Compares the single-block and paged layouts for a full sequential scan
//! and for a parallel fill on the rayon pool.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use commune_benches::{error::BenchSetupError, params::ArrayBenchParams};
use commune_core::{AllocationTracker, Layout, PagedArray};

/// Array lengths to benchmark.
const LENGTHS: &[usize] = &[1 << 16, 1 << 22];

/// Layouts under comparison.
const LAYOUTS: &[Layout] = &[Layout::Single, Layout::Paged];

fn allocate(
    params: ArrayBenchParams,
    tracker: &AllocationTracker,
) -> Result<PagedArray<usize>, BenchSetupError> {
    let mut array = match params.layout {
        Layout::Single => PagedArray::new_single(params.length, tracker)?,
        Layout::Paged => PagedArray::new_paged(params.length, tracker)?,
    };
    array.set_all(|index| index)?;
    Ok(array)
}

fn paged_array_scan_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("paged_array_scan");
    let tracker = AllocationTracker::empty();

    for &length in LENGTHS {
        for &layout in LAYOUTS {
            let params = ArrayBenchParams { length, layout };
            let array = allocate(params, &tracker)?;
            group.bench_with_input(BenchmarkId::from_parameter(params), &array, |b, input| {
                b.iter(|| {
                    let _sum = input
                        .iter()
                        .map(|values| values.fold(0_usize, usize::wrapping_add));
                });
            });
        }
    }

    group.finish();
    Ok(())
}

fn paged_array_par_fill_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("paged_array_par_fill");
    let tracker = AllocationTracker::empty();

    for &length in LENGTHS {
        for &layout in LAYOUTS {
            let params = ArrayBenchParams { length, layout };
            let mut array = allocate(params, &tracker)?;
            group.bench_function(BenchmarkId::from_parameter(params), |b| {
                b.iter(|| {
                    let _filled = array.par_set_all(|index| index.wrapping_mul(31));
                });
            });
        }
    }

    group.finish();
    Ok(())
}

fn paged_array_scan(c: &mut Criterion) {
    if let Err(err) = paged_array_scan_impl(c) {
        panic!("paged_array_scan benchmark setup failed: {err}");
    }
}

fn paged_array_par_fill(c: &mut Criterion) {
    if let Err(err) = paged_array_par_fill_impl(c) {
        panic!("paged_array_par_fill benchmark setup failed: {err}");
    }
}

criterion_group!(benches, paged_array_scan, paged_array_par_fill);
criterion_main!(benches);
