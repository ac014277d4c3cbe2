//! SSE2 4×4 f32 transpose blocks.

use std::arch::x86_64::*;

use super::inner_len;

/// In-register 4×4 transpose.
///
/// Interleave words of row pairs (01, 23), then interleave the resulting
/// doublewords. The transform is its own inverse, so pack and unpack share it.
#[inline(always)]
unsafe fn transpose4x4(r0: __m128, r1: __m128, r2: __m128, r3: __m128) -> [__m128; 4] {
    let r01l = _mm_unpacklo_ps(r0, r1);
    let r01h = _mm_unpackhi_ps(r0, r1);
    let r23l = _mm_unpacklo_ps(r2, r3);
    let r23h = _mm_unpackhi_ps(r2, r3);
    [
        _mm_movelh_ps(r01l, r23l),
        _mm_movehl_ps(r23l, r01l),
        _mm_movelh_ps(r01h, r23h),
        _mm_movehl_ps(r23h, r01h),
    ]
}

#[target_feature(enable = "sse2")]
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
            _mm_loadu_ps(r0.add(j)),
            _mm_loadu_ps(r1.add(j)),
            _mm_loadu_ps(r2.add(j)),
            _mm_loadu_ps(r3.add(j)),
        );
        let o = out.add(4 * j);
        _mm_storeu_ps(o, t[0]);
        _mm_storeu_ps(o.add(4), t[1]);
        _mm_storeu_ps(o.add(8), t[2]);
        _mm_storeu_ps(o.add(12), t[3]);
        j += 4;
    }
    j
}

#[target_feature(enable = "sse2")]
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
            _mm_loadu_ps(i),
            _mm_loadu_ps(i.add(4)),
            _mm_loadu_ps(i.add(8)),
            _mm_loadu_ps(i.add(12)),
        );
        _mm_storeu_ps(p0.add(j), t[0]);
        _mm_storeu_ps(p1.add(j), t[1]);
        _mm_storeu_ps(p2.add(j), t[2]);
        _mm_storeu_ps(p3.add(j), t[3]);
        j += 4;
    }
    j
}

pub(super) fn pack4_f32(planes: &[&[f32]], dst: &mut [f32]) -> usize {
    debug_assert_eq!(planes.len(), 4);
    let len = inner_len(dst.len(), planes.iter().map(|p| p.len()), 4);
    // SAFETY: SSE2 was detected; every access stays below `len` per plane
    // and below `4 * len` in `dst`.
    unsafe { pack4_f32_impl(planes, dst, len) }
}

pub(super) fn unpack4_f32(src: &[f32], planes: &mut [&mut [f32]]) -> usize {
    debug_assert_eq!(planes.len(), 4);
    let len = inner_len(src.len(), planes.iter().map(|p| p.len()), 4);
    // SAFETY: as in `pack4_f32`, with the roles of source and planes swapped.
    unsafe { unpack4_f32_impl(src, planes, len) }
}
