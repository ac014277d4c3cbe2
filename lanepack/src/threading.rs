//! Rayon-based parallel-for over disjoint destination units.
//!
//! Every repack loop has the same shape: the destination splits into
//! consecutive, equally sized units (a row, a channel, or K of them), each
//! written by exactly one iteration. `chunks_mut` provides the disjointness,
//! so no locking or raw pointers are involved.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Minimum number of destination elements to justify multi-threaded execution.
pub const MINTHREADLENGTH: usize = 1 << 15;

/// Run `body(index, unit)` for each `unit_len`-sized chunk of `dst`.
///
/// With the `parallel` feature, `num_threads > 1` and a large enough
/// destination, the units are spread over at most `num_threads` rayon tasks.
/// Iteration order is unspecified.
pub fn for_each_unit<T, F>(dst: &mut [T], unit_len: usize, num_threads: usize, body: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if unit_len == 0 || dst.is_empty() {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        let units = dst.len().div_ceil(unit_len);
        if num_threads > 1 && units > 1 && dst.len() >= MINTHREADLENGTH {
            let per_task = units.div_ceil(num_threads);
            dst.par_chunks_mut(unit_len)
                .with_min_len(per_task)
                .enumerate()
                .for_each(|(q, unit)| body(q, unit));
            return;
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = num_threads;

    for (q, unit) in dst.chunks_mut(unit_len).enumerate() {
        body(q, unit);
    }
}
