//! NEON 4×4 f32 transpose blocks.

use std::arch::aarch64::*;

use super::inner_len;

/// In-register 4×4 transpose: zip words of row pairs, then zip doublewords.
/// Its own inverse.
#[inline(always)]
unsafe fn transpose4x4(
    r0: float32x4_t,
    r1: float32x4_t,
    r2: float32x4_t,
    r3: float32x4_t,
) -> [float32x4_t; 4] {
    let r01l = vreinterpretq_f64_f32(vzip1q_f32(r0, r1));
    let r01h = vreinterpretq_f64_f32(vzip2q_f32(r0, r1));
    let r23l = vreinterpretq_f64_f32(vzip1q_f32(r2, r3));
    let r23h = vreinterpretq_f64_f32(vzip2q_f32(r2, r3));
    [
        vreinterpretq_f32_f64(vzip1q_f64(r01l, r23l)),
        vreinterpretq_f32_f64(vzip2q_f64(r01l, r23l)),
        vreinterpretq_f32_f64(vzip1q_f64(r01h, r23h)),
        vreinterpretq_f32_f64(vzip2q_f64(r01h, r23h)),
    ]
}

#[target_feature(enable = "neon")]
unsafe fn pack4_f32_impl(planes: &[&[f32]], dst: &mut [f32], len: usize) -> usize {
    let (r0, r1, r2, r3) = (
        planes[0].as_ptr(),
        planes[1].as_ptr(),
        planes[2].as_ptr(),
        planes[3].as_ptr(),
    );
    let out = dst.as_mut_ptr();

    let mut j = 0usize;
    while j + 4 <= len {
        let t = transpose4x4(
            vld1q_f32(r0.add(j)),
            vld1q_f32(r1.add(j)),
            vld1q_f32(r2.add(j)),
            vld1q_f32(r3.add(j)),
        );
        let o = out.add(4 * j);
        vst1q_f32(o, t[0]);
        vst1q_f32(o.add(4), t[1]);
        vst1q_f32(o.add(8), t[2]);
        vst1q_f32(o.add(12), t[3]);
        j += 4;
    }
    j
}

#[target_feature(enable = "neon")]
unsafe fn unpack4_f32_impl(src: &[f32], planes: &mut [&mut [f32]], len: usize) -> usize {
    let p0 = planes[0].as_mut_ptr();
    let p1 = planes[1].as_mut_ptr();
    let p2 = planes[2].as_mut_ptr();
    let p3 = planes[3].as_mut_ptr();
    let s = src.as_ptr();

    let mut j = 0usize;
    while j + 4 <= len {
        let i = s.add(4 * j);
        let t = transpose4x4(
            vld1q_f32(i),
            vld1q_f32(i.add(4)),
            vld1q_f32(i.add(8)),
            vld1q_f32(i.add(12)),
        );
        vst1q_f32(p0.add(j), t[0]);
        vst1q_f32(p1.add(j), t[1]);
        vst1q_f32(p2.add(j), t[2]);
        vst1q_f32(p3.add(j), t[3]);
        j += 4;
    }
    j
}

pub(super) fn pack4_f32(planes: &[&[f32]], dst: &mut [f32]) -> usize {
    debug_assert_eq!(planes.len(), 4);
    let len = inner_len(dst.len(), planes.iter().map(|p| p.len()), 4);
    // SAFETY: NEON is mandatory on AArch64; accesses stay below `len` per
    // plane and below `4 * len` in `dst`.
    unsafe { pack4_f32_impl(planes, dst, len) }
}

pub(super) fn unpack4_f32(src: &[f32], planes: &mut [&mut [f32]]) -> usize {
    debug_assert_eq!(planes.len(), 4);
    let len = inner_len(src.len(), planes.iter().map(|p| p.len()), 4);
    // SAFETY: as in `pack4_f32`, with the roles of source and planes swapped.
    unsafe { unpack4_f32_impl(src, planes, len) }
}
