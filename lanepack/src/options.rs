//! Runtime options shared by the packing engine and the fallback operator.

use std::sync::Arc;

use lanepack_mat::{Allocator, HeapAllocator};

/// Per-call execution options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Upper bound on worker threads for the row/channel loop.
    pub num_threads: usize,
    /// Allow the architecture vector fast path. `false` forces the scalar loop.
    pub use_simd: bool,
    /// Allocator for destination mats.
    pub blob_allocator: Arc<dyn Allocator>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            num_threads: default_num_threads(),
            use_simd: true,
            blob_allocator: Arc::new(HeapAllocator),
        }
    }
}

impl Options {
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    pub fn with_simd(mut self, use_simd: bool) -> Self {
        self.use_simd = use_simd;
        self
    }

    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.blob_allocator = allocator;
        self
    }
}

#[cfg(feature = "parallel")]
fn default_num_threads() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "parallel"))]
fn default_num_threads() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanepack_mat::LimitedAllocator;

    #[test]
    fn test_builder() {
        let opt = Options::default()
            .with_num_threads(0)
            .with_simd(false)
            .with_allocator(Arc::new(LimitedAllocator::new(16)));
        assert_eq!(opt.num_threads, 1);
        assert!(!opt.use_simd);
        assert!(opt.blob_allocator.allocate(32).is_none());
    }

    #[test]
    fn test_default_threads_nonzero() {
        assert!(Options::default().num_threads >= 1);
    }
}
