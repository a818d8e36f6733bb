// THEORY:
// The scheduler is a recursive divide-and-conquer task runner. Given a region, a
// cutoff and a unit transform, it either runs the transform sequentially (when the
// region's area is at most the cutoff) or splits the region along its longer axis
// and recurses into both halves through `rayon::join`: one half runs inline on the
// current worker, the other is left for the work-stealing pool, and both finish
// before the call returns.
//
// Key architectural principles:
// 1.  **Granularity Agnostic**: The scheduler only sees areas. Whether a unit is a
//     pixel or a 16x16 block is the caller's business, which is why every filter
//     picks its own cutoff.
// 2.  **No Ordering**: Siblings run in any order, or at the same time. A transform
//     must never depend on visitation order.
// 3.  **Fail Together**: A panic in any unit propagates through the join to the
//     caller, so an invocation either completes fully or not at all.
// 4.  **Reduction**: `schedule_reduce` returns one value per leaf and merges them at
//     every join. This is how phase-one statistics are gathered without locks.
//
// The functions must run inside the engine's pool (`ThreadPool::install`); called
// outside it, `rayon::join` falls back to the global pool.

use crate::core_modules::region::Region;

/// Runs `unit` over `region`, forking until each piece has area `<= cutoff`.
pub fn schedule<F>(region: Region, cutoff: u64, unit: &F)
where
    F: Fn(Region) + Sync,
{
    if region.area() <= cutoff.max(1) {
        unit(region);
        return;
    }
    let (left, right) = region.split();
    rayon::join(
        || schedule(left, cutoff, unit),
        || schedule(right, cutoff, unit),
    );
}

/// Like `schedule`, but each leaf produces a value and siblings are merged with
/// `merge` once both are done.
pub fn schedule_reduce<T, F, M>(region: Region, cutoff: u64, unit: &F, merge: &M) -> T
where
    T: Send,
    F: Fn(Region) -> T + Sync,
    M: Fn(T, T) -> T + Sync,
{
    if region.area() <= cutoff.max(1) {
        return unit(region);
    }
    let (left, right) = region.split();
    let (a, b) = rayon::join(
        || schedule_reduce(left, cutoff, unit, merge),
        || schedule_reduce(right, cutoff, unit, merge),
    );
    merge(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn leaves_respect_the_cutoff_and_cover_the_region() {
        let region = Region::new(0, 37, 0, 53);
        let leaves = Mutex::new(Vec::new());
        schedule(region, 100, &|r: Region| {
            assert!(r.area() <= 100);
            leaves.lock().unwrap().push(r);
        });

        let leaves = leaves.into_inner().unwrap();
        let total: u64 = leaves.iter().map(Region::area).sum();
        assert_eq!(total, region.area());
    }

    #[test]
    fn small_regions_run_as_a_single_leaf() {
        let calls = AtomicU64::new(0);
        schedule(Region::new(0, 4, 0, 4), 16, &|_| {
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn reduce_sums_every_leaf() {
        let region = Region::new(0, 100, 0, 7);
        let total = schedule_reduce(region, 10, &|r: Region| r.area(), &|a, b| a + b);
        assert_eq!(total, 700);
    }

    #[test]
    fn empty_regions_still_run_once() {
        let calls = AtomicU64::new(0);
        schedule(Region::new(0, 0, 0, 10), 1, &|r: Region| {
            assert!(r.is_empty());
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    #[should_panic(expected = "unit failed")]
    fn a_panicking_unit_fails_the_whole_run() {
        schedule(Region::new(0, 64, 0, 64), 8, &|r: Region| {
            if r.xlow == 0 && r.ylow == 0 {
                panic!("unit failed");
            }
        });
    }
}
