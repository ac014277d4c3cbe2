//! Lane-packed tensor buffers.
//!
//! A [`Mat`] is a 1 to 4 dimensional buffer whose innermost storage unit, the
//! *slot*, holds `elempack` scalars interleaved along the channel axis. This
//! crate owns the data model only; the repacking kernels live in `lanepack`.
//!
//! # Core Types
//!
//! - [`Mat`]: Shared (reference-counted) tensor buffer; cloning aliases
//! - [`Shape`]: Rank and extents (`w`, `h`, `d`, `c`)
//! - [`MatLayout`]: Full metadata record (shape + `elemsize`/`elempack`/`cstep`)
//! - [`Allocator`] with [`HeapAllocator`] and [`LimitedAllocator`]
//! - [`Element`]: Scalar types a mat can be viewed as
//!
//! # Example
//!
//! ```rust
//! use lanepack_mat::{Mat, Shape};
//!
//! let m = Mat::from_packed(Shape::d2(2, 4), 1, &[1.0f32, 2., 3., 4., 5., 6., 7., 8.]).unwrap();
//! assert_eq!(m.row::<f32>(1).unwrap(), &[3.0, 4.0]);
//! assert_eq!(m.elembits(), 32);
//! ```

mod allocator;
mod element;
mod mat;

pub use allocator::{Allocator, Buffer, HeapAllocator, LimitedAllocator};
pub use element::Element;
pub use mat::{align_size, Mat, MatLayout, Shape};

/// Channel data alignment in bytes (dims 3 and 4).
pub const CHANNEL_ALIGN: usize = 16;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while creating or accessing a [`Mat`].
#[derive(Debug, thiserror::Error)]
pub enum MatError {
    /// The allocator could not provide the requested storage.
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },

    /// Rank outside `1..=4`, or extents not representable.
    #[error("invalid shape: dims={dims}")]
    InvalidShape { dims: usize },

    /// `elemsize` is not a non-zero multiple of a non-zero `elempack`.
    #[error("invalid packing: elemsize={elemsize}, elempack={elempack}")]
    InvalidPack { elemsize: usize, elempack: usize },

    /// A byte count overflowed `usize`.
    #[error("layout size overflow")]
    LayoutOverflow,

    /// Provided scalar count does not match the shape.
    #[error("length mismatch: expected {expected} scalars, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Requested scalar width does not match the slot layout.
    #[error("element size mismatch: mat lane is {lane} bytes, requested type is {requested} bytes")]
    ElementMismatch { lane: usize, requested: usize },

    /// Row/channel index out of range.
    #[error("index {index} out of bounds for extent {extent}")]
    OutOfBounds { index: usize, extent: usize },

    /// Mutable access requested while another mat aliases the storage.
    #[error("storage is shared with another mat")]
    SharedStorage,

    /// The new layout needs more bytes than the storage holds.
    #[error("layout needs {needed} bytes but storage holds {available}")]
    LayoutTooLarge { needed: usize, available: usize },

    /// Reinterpreting storage bytes as the requested type failed.
    #[error("storage cast failed: {0:?}")]
    Cast(bytemuck::PodCastError),
}

/// Result type for mat operations.
pub type Result<T> = std::result::Result<T, MatError>;
