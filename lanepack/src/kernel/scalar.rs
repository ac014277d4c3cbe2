//! Generic scalar interleave / de-interleave loops.
//!
//! These are the reference implementation for every lane type and pack
//! factor, and the tail handler behind the vector blocks.

/// `dst[K*j + k] = planes[k][j]` for every inner index `j`, with
/// `K = planes.len()` and `L = dst.len() / K`.
#[inline]
pub fn pack_planes_scalar<T: Copy>(planes: &[&[T]], dst: &mut [T]) {
    pack_planes_from(planes, dst, 0);
}

/// `planes[k][j] = src[K*j + k]` for every inner index `j`.
#[inline]
pub fn unpack_planes_scalar<T: Copy>(src: &[T], planes: &mut [&mut [T]]) {
    unpack_planes_from(src, planes, 0);
}

/// [`pack_planes_scalar`] restricted to inner indices `from..L`.
#[inline]
pub(crate) fn pack_planes_from<T: Copy>(planes: &[&[T]], dst: &mut [T], from: usize) {
    let k = planes.len();
    if k == 0 {
        return;
    }
    for (j, slot) in dst.chunks_exact_mut(k).enumerate().skip(from) {
        for (lane, plane) in slot.iter_mut().zip(planes) {
            *lane = plane[j];
        }
    }
}

/// [`unpack_planes_scalar`] restricted to inner indices `from..L`.
#[inline]
pub(crate) fn unpack_planes_from<T: Copy>(src: &[T], planes: &mut [&mut [T]], from: usize) {
    let k = planes.len();
    if k == 0 {
        return;
    }
    for (j, slot) in src.chunks_exact(k).enumerate().skip(from) {
        for (plane, &v) in planes.iter_mut().zip(slot) {
            plane[j] = v;
        }
    }
}
