//! Transform classification and output shape computation.
//!
//! The classification tag is computed once per call; the packing layer then
//! dispatches on it.

use lanepack_mat::{Mat, MatError, MatLayout, Shape};

use crate::Result;

/// Numeric kind of a mat, derived from its scalar bit width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericKind {
    F32,
    I8,
    /// Any other width (e.g. 16-bit half floats); always delegated.
    Other(usize),
}

impl NumericKind {
    pub fn of(mat: &Mat) -> Self {
        Self::from_bits(mat.elembits())
    }

    pub const fn from_bits(bits: usize) -> Self {
        match bits {
            32 => Self::F32,
            8 => Self::I8,
            b => Self::Other(b),
        }
    }

    /// Pack factor the engine transforms natively for this kind.
    pub const fn native_pack(self) -> Option<usize> {
        match self {
            Self::F32 => Some(4),
            Self::I8 => Some(8),
            Self::Other(_) => None,
        }
    }
}

/// What a repack request asks the engine to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformKind {
    /// Source already has the requested pack; alias it.
    Identity,
    /// Not a native 1↔K swap; delegate to the generic operator.
    Unsupported,
    /// Interleave K unpacked planes into one packed plane.
    Pack1toK,
    /// Scatter one packed plane into K unpacked planes.
    PackKto1,
}

/// Classify a request.
///
/// Padding is only implemented by the generic operator, so a request that
/// allows padding is `Unsupported` for the native paths.
pub fn classify(
    kind: NumericKind,
    elempack: usize,
    out_elempack: usize,
    use_padding: bool,
) -> TransformKind {
    let Some(k) = kind.native_pack() else {
        return TransformKind::Unsupported;
    };
    if use_padding {
        return TransformKind::Unsupported;
    }
    if elempack == out_elempack {
        return TransformKind::Identity;
    }
    match (elempack, out_elempack) {
        (1, o) if o == k => TransformKind::Pack1toK,
        (e, 1) if e == k => TransformKind::PackKto1,
        _ => TransformKind::Unsupported,
    }
}

/// Reject a requested pack factor of zero.
pub fn check_out_elempack(layout: &MatLayout, out_elempack: usize) -> Result<()> {
    if out_elempack == 0 {
        return Err(MatError::InvalidPack {
            elemsize: layout.lane_size() * out_elempack,
            elempack: out_elempack,
        }
        .into());
    }
    Ok(())
}

/// Logical scalar extent of the axis that carries the pack:
/// `w` for dims 1, `h` for dims 2, `c` for dims 3/4.
pub fn packed_axis_extent(shape: Shape, elempack: usize) -> usize {
    let axis = match shape.dims {
        1 => shape.w,
        2 => shape.h,
        _ => shape.c,
    };
    axis * elempack
}

/// Whether the packed axis splits evenly into `out_elempack` lanes.
pub fn is_divisible(layout: &MatLayout, out_elempack: usize) -> bool {
    packed_axis_extent(layout.shape, layout.elempack) % out_elempack == 0
}

/// Shape with the packed axis resized to `extent` slots.
pub fn with_packed_axis(shape: Shape, extent: usize) -> Shape {
    match shape.dims {
        1 => Shape::d1(extent),
        2 => Shape::d2(shape.w, extent),
        3 => Shape::d3(shape.w, shape.h, extent),
        _ => Shape::d4(shape.w, shape.h, shape.d, extent),
    }
}

/// Output layout of an exact (divisible) repack.
///
/// dims 1 keeps the source channel step scaled by the pack ratio, since the
/// result is a reinterpretation of the same contiguous scalars. dims 2/3/4
/// get a fresh layout with the default channel step.
pub fn output_layout(layout: &MatLayout, out_elempack: usize) -> Result<MatLayout> {
    let elempack = layout.elempack;
    let extent = packed_axis_extent(layout.shape, elempack) / out_elempack;
    let shape = with_packed_axis(layout.shape, extent);
    let out_elemsize = layout.elemsize / elempack * out_elempack;

    if layout.shape.dims == 1 {
        return Ok(MatLayout {
            shape,
            elemsize: out_elemsize,
            elempack: out_elempack,
            cstep: layout.cstep * elempack / out_elempack,
        });
    }
    Ok(MatLayout::new(shape, out_elemsize, out_elempack)?)
}
