//! Plane transpose loops over rows (dims 2) or channels (dims 3/4).
//!
//! Strides are in scalars. The outer loop runs over the destination units
//! via [`for_each_unit`], so each iteration owns its output exclusively and
//! only reads the shared source.

use smallvec::SmallVec;

use crate::kernel::PackLane;
use crate::threading::for_each_unit;
use crate::Options;

/// Up to 8 planes (the widest native pack) without heap allocation.
type Planes<P> = SmallVec<[P; 8]>;

/// Geometry of one transpose, in scalars.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlaneGeometry {
    /// Distance between consecutive source planes.
    pub src_stride: usize,
    /// Distance between consecutive destination planes.
    pub dst_stride: usize,
    /// Slots per plane (`w` for rows, `w*h*d` for channels).
    pub inner: usize,
}

/// 1→K: destination plane `q` interleaves source planes `q*K .. q*K+K`.
pub(crate) fn pack_1_to_k<T: PackLane>(
    src: &[T],
    dst: &mut [T],
    g: PlaneGeometry,
    opt: &Options,
) {
    let k = T::PACK;
    let inner = g.inner;
    let use_simd = opt.use_simd;
    for_each_unit(dst, g.dst_stride, opt.num_threads, |q, out| {
        let planes: Planes<&[T]> = (0..k)
            .map(|i| {
                let start = (q * k + i) * g.src_stride;
                &src[start..start + inner]
            })
            .collect();
        T::pack_planes(&planes, &mut out[..inner * k], use_simd);
    });
}

/// K→1: source plane `q` scatters into destination planes `q*K .. q*K+K`.
pub(crate) fn unpack_k_to_1<T: PackLane>(
    src: &[T],
    dst: &mut [T],
    g: PlaneGeometry,
    opt: &Options,
) {
    let k = T::PACK;
    let inner = g.inner;
    let use_simd = opt.use_simd;
    for_each_unit(dst, g.dst_stride * k, opt.num_threads, |q, out| {
        let start = q * g.src_stride;
        let packed = &src[start..start + inner * k];
        let mut planes: Planes<&mut [T]> = out
            .chunks_mut(g.dst_stride)
            .map(|plane| &mut plane[..inner])
            .collect();
        T::unpack_planes(packed, &mut planes, use_simd);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serial() -> Options {
        Options::default().with_num_threads(1)
    }

    #[test]
    fn test_pack_rows_with_gaps() {
        // 8 source planes of 3 slots at stride 4, packed into 2 planes at stride 12
        let src: Vec<f32> = (0..32).map(|i| i as f32).collect();
        let mut dst = vec![-1.0f32; 24];
        let g = PlaneGeometry {
            src_stride: 4,
            dst_stride: 12,
            inner: 3,
        };
        pack_1_to_k(&src, &mut dst, g, &serial());
        assert_eq!(&dst[..4], &[0.0, 4.0, 8.0, 12.0]);
        assert_eq!(&dst[8..12], &[2.0, 6.0, 10.0, 14.0]);
        assert_eq!(&dst[12..16], &[16.0, 20.0, 24.0, 28.0]);
    }

    #[test]
    fn test_unpack_i8_channels() {
        // one packed plane of 2 slots -> 8 planes of stride 16
        let src: Vec<i8> = (0..16).collect();
        let mut dst = vec![0i8; 128];
        let g = PlaneGeometry {
            src_stride: 16,
            dst_stride: 16,
            inner: 2,
        };
        unpack_k_to_1(&src, &mut dst, g, &serial());
        for k in 0..8 {
            assert_eq!(&dst[k * 16..k * 16 + 2], &[k as i8, 8 + k as i8]);
            assert!(dst[k * 16 + 2..(k + 1) * 16].iter().all(|&v| v == 0));
        }
    }
}
