//! Plane interleave / de-interleave kernels.
//!
//! Repacking reduces to one operation on K planes of length L:
//!
//! - pack 1→K: `dst[K*j + k] = planes[k][j]`
//! - unpack K→1: `planes[k][j] = src[K*j + k]`
//!
//! which is a `K × L` ↔ `L × K` transpose. The scalar loops in [`scalar`] are
//! the reference; `f32` additionally has a 4×4 register transpose for
//! 128-bit vector units. `i8` has no vector path.

pub mod scalar;

#[cfg(all(feature = "simd", target_arch = "aarch64"))]
mod neon;
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod sse2;

pub use scalar::{pack_planes_scalar, unpack_planes_scalar};

use lanepack_mat::Element;

use crate::plan::NumericKind;
use crate::simd::detect_simd;

/// Scalar type with a natively supported pack factor.
///
/// The default methods run the scalar loop. Types with a vector fast path
/// override them and finish the remainder with the scalar loop, so both
/// paths produce identical bytes.
pub trait PackLane: Element {
    /// Native pack factor (slot width in scalars).
    const PACK: usize;

    /// Numeric kind this lane type implements.
    const KIND: NumericKind;

    /// Interleave `PACK` planes into `dst` (`dst.len() == PACK * L`).
    fn pack_planes(planes: &[&[Self]], dst: &mut [Self], use_simd: bool) {
        let _ = use_simd;
        pack_planes_scalar(planes, dst);
    }

    /// Scatter `src` (`PACK * L` scalars) into `PACK` planes.
    fn unpack_planes(src: &[Self], planes: &mut [&mut [Self]], use_simd: bool) {
        let _ = use_simd;
        unpack_planes_scalar(src, planes);
    }
}

impl PackLane for f32 {
    const PACK: usize = 4;
    const KIND: NumericKind = NumericKind::F32;

    fn pack_planes(planes: &[&[f32]], dst: &mut [f32], use_simd: bool) {
        let done = if use_simd {
            pack4_f32_vector(planes, dst)
        } else {
            0
        };
        scalar::pack_planes_from(planes, dst, done);
    }

    fn unpack_planes(src: &[f32], planes: &mut [&mut [f32]], use_simd: bool) {
        let done = if use_simd {
            unpack4_f32_vector(src, planes)
        } else {
            0
        };
        scalar::unpack_planes_from(src, planes, done);
    }
}

// The i8 1<->8 transform has no vector path even though 128-bit byte
// shuffles could express it; it stays on the scalar byte loop.
impl PackLane for i8 {
    const PACK: usize = 8;
    const KIND: NumericKind = NumericKind::I8;
}

/// Vector block part of the f32 1→4 interleave.
///
/// Processes whole blocks of 4 inner elements and returns how many inner
/// elements were written; the caller finishes `[returned, L)` with the
/// scalar loop. Returns 0 when no vector unit is available.
pub fn pack4_f32_vector(planes: &[&[f32]], dst: &mut [f32]) -> usize {
    if planes.len() != 4 {
        return 0;
    }
    match detect_simd() {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        crate::simd::SimdLevel::Sse2 => sse2::pack4_f32(planes, dst),
        #[cfg(all(feature = "simd", target_arch = "aarch64"))]
        crate::simd::SimdLevel::Neon => neon::pack4_f32(planes, dst),
        _ => 0,
    }
}

/// Vector block part of the f32 4→1 de-interleave. See [`pack4_f32_vector`].
pub fn unpack4_f32_vector(src: &[f32], planes: &mut [&mut [f32]]) -> usize {
    if planes.len() != 4 {
        return 0;
    }
    match detect_simd() {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        crate::simd::SimdLevel::Sse2 => sse2::unpack4_f32(src, planes),
        #[cfg(all(feature = "simd", target_arch = "aarch64"))]
        crate::simd::SimdLevel::Neon => neon::unpack4_f32(src, planes),
        _ => 0,
    }
}

/// Inner length both sides can serve: the shortest plane, capped by the
/// packed side.
#[cfg(all(feature = "simd", any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn inner_len(packed_len: usize, plane_lens: impl Iterator<Item = usize>, pack: usize) -> usize {
    plane_lens.fold(packed_len / pack, usize::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_planes(len: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..4)
            .map(|_| (0..len).map(|_| rng.gen_range(-1e6f32..1e6)).collect())
            .collect()
    }

    #[test]
    fn test_f32_vector_matches_scalar_pack() {
        for len in [0usize, 1, 3, 4, 5, 8, 13, 64, 67] {
            let planes = random_planes(len, len as u64);
            let refs: Vec<&[f32]> = planes.iter().map(|p| p.as_slice()).collect();

            let mut scalar = vec![0.0f32; 4 * len];
            f32::pack_planes(&refs, &mut scalar, false);
            let mut vector = vec![0.0f32; 4 * len];
            f32::pack_planes(&refs, &mut vector, true);

            let sb: Vec<u32> = scalar.iter().map(|x| x.to_bits()).collect();
            let vb: Vec<u32> = vector.iter().map(|x| x.to_bits()).collect();
            assert_eq!(sb, vb, "len={len}");
        }
    }

    #[test]
    fn test_f32_vector_matches_scalar_unpack() {
        for len in [0usize, 2, 4, 7, 16, 33] {
            let mut rng = StdRng::seed_from_u64(99 + len as u64);
            let src: Vec<f32> = (0..4 * len).map(|_| rng.gen()).collect();

            let mut scalar = vec![vec![0.0f32; len]; 4];
            {
                let mut refs: Vec<&mut [f32]> = scalar.iter_mut().map(|p| p.as_mut_slice()).collect();
                f32::unpack_planes(&src, &mut refs, false);
            }
            let mut vector = vec![vec![0.0f32; len]; 4];
            {
                let mut refs: Vec<&mut [f32]> = vector.iter_mut().map(|p| p.as_mut_slice()).collect();
                f32::unpack_planes(&src, &mut refs, true);
            }
            assert_eq!(scalar, vector, "len={len}");
        }
    }

    #[test]
    fn test_vector_block_count() {
        let planes = random_planes(11, 7);
        let refs: Vec<&[f32]> = planes.iter().map(|p| p.as_slice()).collect();
        let mut dst = vec![0.0f32; 44];
        let done = pack4_f32_vector(&refs, &mut dst);
        if detect_simd().is_vector() {
            assert_eq!(done, 8);
            for j in 0..done {
                for k in 0..4 {
                    assert_eq!(dst[4 * j + k], planes[k][j]);
                }
            }
        } else {
            assert_eq!(done, 0);
        }
    }

    #[test]
    fn test_vector_rejects_wrong_plane_count() {
        let a = [1.0f32; 8];
        let refs: Vec<&[f32]> = vec![&a, &a];
        let mut dst = [0.0f32; 16];
        assert_eq!(pack4_f32_vector(&refs, &mut dst), 0);
    }

    #[test]
    fn test_i8_uses_scalar_loop() {
        let planes: Vec<Vec<i8>> = (0..8).map(|k| vec![k as i8; 5]).collect();
        let refs: Vec<&[i8]> = planes.iter().map(|p| p.as_slice()).collect();
        let mut dst = vec![0i8; 40];
        i8::pack_planes(&refs, &mut dst, true);
        for slot in dst.chunks_exact(8) {
            assert_eq!(slot, &[0, 1, 2, 3, 4, 5, 6, 7]);
        }
    }
}
