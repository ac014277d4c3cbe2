//! Generic lane-by-lane packing operator.
//!
//! Handles every scalar width and every pair of pack factors, including
//! padded output when the packed axis does not divide evenly. Lanes past the
//! logical end of the axis are left zero. Works on raw bytes, so it never
//! interprets the values it moves.

use lanepack_mat::{Mat, Shape};

use crate::packing::allocate;
use crate::plan::{
    check_out_elempack, is_divisible, output_layout, packed_axis_extent, with_packed_axis,
};
use crate::threading::for_each_unit;
use crate::{Options, Result};

/// Byte geometry of a lane copy between two pack factors.
#[derive(Clone, Copy, Debug)]
struct LaneGeometry {
    /// Bytes between consecutive source planes.
    src_plane: usize,
    /// Bytes between consecutive destination planes.
    dst_plane: usize,
    /// Slots per plane.
    inner: usize,
    /// Logical scalar extent of the packed axis.
    logical: usize,
    /// Bytes per scalar.
    lane: usize,
    elempack: usize,
    out_elempack: usize,
}

/// Repack `bottom` to `out_elempack` without assuming anything about the
/// scalar type.
pub fn pack_generic(
    bottom: &Mat,
    out_elempack: usize,
    use_padding: bool,
    opt: &Options,
) -> Result<Mat> {
    let layout = *bottom.layout();
    let elempack = layout.elempack;
    check_out_elempack(&layout, out_elempack)?;

    if elempack == out_elempack {
        return Ok(bottom.clone());
    }

    let divisible = is_divisible(&layout, out_elempack);
    if !use_padding && !divisible {
        log::debug!(
            "generic pack skipped: axis of {} scalars not divisible by {out_elempack}",
            packed_axis_extent(layout.shape, elempack)
        );
        return Ok(bottom.clone());
    }

    let shape = layout.shape;
    let lane = layout.lane_size();
    let out_elemsize = lane * out_elempack;
    let logical = packed_axis_extent(shape, elempack);
    let out_extent = logical.div_ceil(out_elempack);

    log::trace!(
        "generic pack: dims={} elempack {elempack} -> {out_elempack}, lane={lane}B, padded={}",
        shape.dims,
        !divisible
    );

    if shape.dims == 1 {
        if divisible {
            return Ok(bottom.view_as(output_layout(&layout, out_elempack)?)?);
        }
        let mut top = allocate(Shape::d1(out_extent), out_elemsize, out_elempack, opt)?;
        let n = shape.w * layout.elemsize;
        top.as_bytes_mut()?[..n].copy_from_slice(&bottom.as_bytes()[..n]);
        return Ok(top);
    }

    let mut top = allocate(
        with_packed_axis(shape, out_extent),
        out_elemsize,
        out_elempack,
        opt,
    )?;
    let (src_plane, dst_plane, inner) = if shape.dims == 2 {
        (shape.w * layout.elemsize, shape.w * out_elemsize, shape.w)
    } else {
        (
            layout.cstep * layout.elemsize,
            top.cstep() * out_elemsize,
            shape.size(),
        )
    };
    let g = LaneGeometry {
        src_plane,
        dst_plane,
        inner,
        logical,
        lane,
        elempack,
        out_elempack,
    };
    copy_lanes(bottom.as_bytes(), top.as_bytes_mut()?, g, opt.num_threads);
    Ok(top)
}

/// Destination plane `i`, lane `k` takes logical plane `i*out_elempack + k`,
/// found in source plane `/elempack` at lane `%elempack`.
fn copy_lanes(src: &[u8], dst: &mut [u8], g: LaneGeometry, num_threads: usize) {
    let in_elemsize = g.lane * g.elempack;
    let out_elemsize = g.lane * g.out_elempack;
    for_each_unit(dst, g.dst_plane, num_threads, |i, out| {
        for k in 0..g.out_elempack {
            let y = i * g.out_elempack + k;
            if y >= g.logical {
                break;
            }
            let row = &src[(y / g.elempack) * g.src_plane..];
            let src_lane = (y % g.elempack) * g.lane;
            for j in 0..g.inner {
                let s = j * in_elemsize + src_lane;
                let d = j * out_elemsize + k * g.lane;
                out[d..d + g.lane].copy_from_slice(&row[s..s + g.lane]);
            }
        }
    });
}
