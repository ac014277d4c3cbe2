//! Repacking of [`Mat`] buffers between SIMD lane-pack layouts.
//!
//! A lane-pack factor K stores K channel-adjacent scalars interleaved in one
//! slot. This crate converts between the packed and unpacked forms:
//!
//! - `f32`: 1 ↔ 4 (128-bit vector fast path on x86_64 / aarch64)
//! - `i8`: 1 ↔ 8 (scalar byte loop)
//!
//! Every other combination (other scalar widths, other pack factors,
//! padded layouts) goes through the generic lane-by-lane operator in
//! [`fallback`].
//!
//! # Decision order
//!
//! 1. Unsupported combination → [`fallback::pack_generic`]
//! 2. `elempack == out_elempack` → alias of the input
//! 3. Packed axis not divisible and padding disallowed → alias of the input
//! 4. dims 1 → metadata-only reinterpretation; dims 2/3/4 → plane transpose
//!
//! # Example
//!
//! ```rust
//! use lanepack::{repack, Mat, Shape};
//!
//! let rows = [1.0f32, 2., 3., 4., 5., 6., 7., 8.];
//! let m = Mat::from_packed(Shape::d2(2, 4), 1, &rows).unwrap();
//!
//! let packed = repack(&m, 4, false, 1).unwrap();
//! assert_eq!(packed.h(), 1);
//! assert_eq!(packed.row::<f32>(0).unwrap(), &[1., 3., 5., 7., 2., 4., 6., 8.]);
//!
//! let unpacked = repack(&packed, 1, false, 1).unwrap();
//! assert_eq!(unpacked.to_packed::<f32>().unwrap(), rows);
//! ```
//!
//! # Features
//!
//! - `parallel` (default): distribute rows/channels over rayon workers
//! - `simd` (default): enable the `f32` vector fast path

mod execute;
pub mod fallback;
pub mod kernel;
mod options;
mod packing;
pub mod plan;
pub mod simd;
pub mod threading;

pub use kernel::PackLane;
pub use options::Options;
pub use packing::{repack, Packing};
pub use plan::{NumericKind, TransformKind};
pub use simd::{detect_simd, SimdLevel};

pub use lanepack_mat::{
    Allocator, HeapAllocator, LimitedAllocator, Mat, MatError, MatLayout, Shape,
};

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while repacking.
///
/// Unsupported combinations and the padding skip are not errors: the first
/// is delegated to [`fallback::pack_generic`], the second returns the input.
#[derive(Debug, thiserror::Error)]
pub enum RepackError {
    /// The destination mat could not be allocated.
    #[error("failed to allocate {bytes} bytes for the repacked mat")]
    AllocationFailed { bytes: usize },

    /// The buffer rejected an access (shape, element width, aliasing).
    #[error(transparent)]
    Mat(MatError),
}

impl From<MatError> for RepackError {
    fn from(err: MatError) -> Self {
        match err {
            MatError::AllocationFailed { bytes } => RepackError::AllocationFailed { bytes },
            other => RepackError::Mat(other),
        }
    }
}

/// Result type for repacking operations.
pub type Result<T> = std::result::Result<T, RepackError>;
