//! The [`Mat`] tensor buffer and its layout metadata.

use std::sync::Arc;

use crate::allocator::{Allocator, Buffer, HeapAllocator};
use crate::element::Element;
use crate::{MatError, Result, CHANNEL_ALIGN};

/// Round `sz` up to a multiple of `n` (`n` must be a power of two).
#[inline]
pub const fn align_size(sz: usize, n: usize) -> usize {
    (sz + n - 1) & !(n - 1)
}

// ============================================================================
// Shape / MatLayout
// ============================================================================

/// Rank and extents of a mat. Unused axes are 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub dims: usize,
    pub w: usize,
    pub h: usize,
    pub d: usize,
    pub c: usize,
}

impl Shape {
    pub const fn d1(w: usize) -> Self {
        Self {
            dims: 1,
            w,
            h: 1,
            d: 1,
            c: 1,
        }
    }

    pub const fn d2(w: usize, h: usize) -> Self {
        Self {
            dims: 2,
            w,
            h,
            d: 1,
            c: 1,
        }
    }

    pub const fn d3(w: usize, h: usize, c: usize) -> Self {
        Self {
            dims: 3,
            w,
            h,
            d: 1,
            c,
        }
    }

    pub const fn d4(w: usize, h: usize, d: usize, c: usize) -> Self {
        Self {
            dims: 4,
            w,
            h,
            d,
            c,
        }
    }

    /// Spatial size of one channel, `w * h * d`.
    #[inline]
    pub const fn size(&self) -> usize {
        self.w * self.h * self.d
    }

    /// Number of slots, ignoring channel alignment.
    #[inline]
    pub const fn slots(&self) -> usize {
        self.size() * self.c
    }
}

/// Complete layout description: shape plus slot geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatLayout {
    pub shape: Shape,
    /// Bytes per slot (scalar width times `elempack`).
    pub elemsize: usize,
    /// Scalars interleaved in one slot.
    pub elempack: usize,
    /// Slots between the starts of consecutive channels.
    pub cstep: usize,
}

impl MatLayout {
    /// Layout with the default channel step for `shape`.
    ///
    /// Channels of 3D/4D mats start on a [`CHANNEL_ALIGN`]-byte boundary.
    pub fn new(shape: Shape, elemsize: usize, elempack: usize) -> Result<Self> {
        if !(1..=4).contains(&shape.dims) {
            return Err(MatError::InvalidShape { dims: shape.dims });
        }
        if elempack == 0 || elemsize == 0 || elemsize % elempack != 0 {
            return Err(MatError::InvalidPack { elemsize, elempack });
        }
        let cstep = match shape.dims {
            1 => shape.w,
            2 => shape.w * shape.h,
            _ => {
                let bytes = shape
                    .size()
                    .checked_mul(elemsize)
                    .ok_or(MatError::LayoutOverflow)?;
                align_size(bytes, CHANNEL_ALIGN) / elemsize
            }
        };
        let layout = Self {
            shape,
            elemsize,
            elempack,
            cstep,
        };
        layout.required_bytes()?;
        Ok(layout)
    }

    /// Total slots including channel gaps, `cstep * c`.
    #[inline]
    pub fn total(&self) -> usize {
        self.cstep * self.shape.c
    }

    /// Bytes of one scalar lane.
    #[inline]
    pub fn lane_size(&self) -> usize {
        self.elemsize / self.elempack
    }

    #[inline]
    pub fn elembits(&self) -> usize {
        self.lane_size() * 8
    }

    /// Storage bytes this layout addresses.
    pub fn required_bytes(&self) -> Result<usize> {
        self.cstep
            .checked_mul(self.shape.c)
            .and_then(|t| t.checked_mul(self.elemsize))
            .ok_or(MatError::LayoutOverflow)
    }
}

// ============================================================================
// Mat
// ============================================================================

/// Reference-counted tensor buffer.
///
/// `Clone` is shallow: the clone aliases the same storage. Mutable access is
/// only granted while the storage is not shared, so a mat that was handed
/// to someone else can never be written through.
#[derive(Clone)]
pub struct Mat {
    storage: Arc<Buffer>,
    layout: MatLayout,
}

impl std::fmt::Debug for Mat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mat")
            .field("shape", &self.layout.shape)
            .field("elemsize", &self.layout.elemsize)
            .field("elempack", &self.layout.elempack)
            .field("cstep", &self.layout.cstep)
            .finish()
    }
}

impl Mat {
    /// Allocate a zero-filled mat through `allocator`.
    pub fn create(
        shape: Shape,
        elemsize: usize,
        elempack: usize,
        allocator: &dyn Allocator,
    ) -> Result<Self> {
        let layout = MatLayout::new(shape, elemsize, elempack)?;
        let bytes = layout.required_bytes()?;
        let buffer = allocator
            .allocate(bytes)
            .ok_or(MatError::AllocationFailed { bytes })?;
        Ok(Self {
            storage: Arc::new(buffer),
            layout,
        })
    }

    /// Build a mat from densely ordered scalars.
    ///
    /// `values` lists each channel's `w*h*d*elempack` scalars back to back,
    /// in storage order and without the channel gap.
    pub fn from_packed<T: Element>(shape: Shape, elempack: usize, values: &[T]) -> Result<Self> {
        let elemsize = std::mem::size_of::<T>() * elempack;
        let mut mat = Self::create(shape, elemsize, elempack, &HeapAllocator)?;
        let plane = shape.size() * elempack;
        let expected = plane * shape.c;
        if values.len() != expected {
            return Err(MatError::LengthMismatch {
                expected,
                found: values.len(),
            });
        }
        if plane == 0 {
            return Ok(mat);
        }
        let step = mat.layout.cstep * elempack;
        let data = mat.as_mut_slice::<T>()?;
        for (dst, src) in data.chunks_mut(step).zip(values.chunks_exact(plane)) {
            dst[..plane].copy_from_slice(src);
        }
        Ok(mat)
    }

    /// Inverse of [`Mat::from_packed`]: scalars in storage order, gaps skipped.
    pub fn to_packed<T: Element>(&self) -> Result<Vec<T>> {
        let plane = self.layout.shape.size() * self.layout.elempack;
        let mut out = Vec::with_capacity(plane * self.layout.shape.c);
        for q in 0..self.layout.shape.c {
            out.extend_from_slice(self.channel::<T>(q)?);
        }
        Ok(out)
    }

    /// Describe the same storage with a different layout (no copy).
    pub fn view_as(&self, layout: MatLayout) -> Result<Self> {
        let needed = layout.required_bytes()?;
        let available = self.storage.len();
        if needed > available {
            return Err(MatError::LayoutTooLarge { needed, available });
        }
        Ok(Self {
            storage: Arc::clone(&self.storage),
            layout,
        })
    }

    #[inline]
    pub fn layout(&self) -> &MatLayout {
        &self.layout
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.layout.shape
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.layout.shape.dims
    }

    #[inline]
    pub fn w(&self) -> usize {
        self.layout.shape.w
    }

    #[inline]
    pub fn h(&self) -> usize {
        self.layout.shape.h
    }

    #[inline]
    pub fn d(&self) -> usize {
        self.layout.shape.d
    }

    #[inline]
    pub fn c(&self) -> usize {
        self.layout.shape.c
    }

    #[inline]
    pub fn elemsize(&self) -> usize {
        self.layout.elemsize
    }

    #[inline]
    pub fn elempack(&self) -> usize {
        self.layout.elempack
    }

    #[inline]
    pub fn cstep(&self) -> usize {
        self.layout.cstep
    }

    /// Bit width of one logical scalar.
    #[inline]
    pub fn elembits(&self) -> usize {
        self.layout.elembits()
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.layout.total()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// True when both mats alias one allocation.
    #[inline]
    pub fn shares_storage(&self, other: &Mat) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Bytes addressed by the layout.
    pub fn as_bytes(&self) -> &[u8] {
        let bytes = self.total() * self.layout.elemsize;
        &self.storage.as_bytes()[..bytes]
    }

    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8]> {
        let bytes = self.total() * self.layout.elemsize;
        let storage = Arc::get_mut(&mut self.storage).ok_or(MatError::SharedStorage)?;
        Ok(&mut storage.as_bytes_mut()[..bytes])
    }

    /// All scalars of the layout, channel gaps included.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.check_lane::<T>()?;
        let n = self.total() * self.layout.elempack;
        Ok(&self.storage.cast::<T>()?[..n])
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        self.check_lane::<T>()?;
        let n = self.total() * self.layout.elempack;
        let storage = Arc::get_mut(&mut self.storage).ok_or(MatError::SharedStorage)?;
        Ok(&mut storage.cast_mut::<T>()?[..n])
    }

    /// Scalars of channel `q` (`w*h*d*elempack` of them).
    pub fn channel<T: Element>(&self, q: usize) -> Result<&[T]> {
        let c = self.layout.shape.c;
        if q >= c {
            return Err(MatError::OutOfBounds {
                index: q,
                extent: c,
            });
        }
        let pack = self.layout.elempack;
        let start = q * self.layout.cstep * pack;
        let len = self.layout.shape.size() * pack;
        Ok(&self.as_slice::<T>()?[start..start + len])
    }

    /// Scalars of row `y` of a 1D or 2D mat (`w*elempack` of them).
    pub fn row<T: Element>(&self, y: usize) -> Result<&[T]> {
        let shape = self.layout.shape;
        if shape.dims > 2 {
            return Err(MatError::InvalidShape { dims: shape.dims });
        }
        if y >= shape.h {
            return Err(MatError::OutOfBounds {
                index: y,
                extent: shape.h,
            });
        }
        let len = shape.w * self.layout.elempack;
        Ok(&self.as_slice::<T>()?[y * len..(y + 1) * len])
    }

    fn check_lane<T: Element>(&self) -> Result<()> {
        if T::BITS != self.elembits() {
            return Err(MatError::ElementMismatch {
                lane: self.layout.lane_size(),
                requested: T::BITS / 8,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LimitedAllocator;

    #[test]
    fn test_cstep_dims_1_2() {
        let l1 = MatLayout::new(Shape::d1(7), 4, 1).unwrap();
        assert_eq!(l1.cstep, 7);
        let l2 = MatLayout::new(Shape::d2(3, 5), 4, 1).unwrap();
        assert_eq!(l2.cstep, 15);
        assert_eq!(l2.total(), 15);
    }

    #[test]
    fn test_cstep_channel_alignment() {
        // 3 f32 = 12 bytes -> 16 bytes -> 4 slots
        let l = MatLayout::new(Shape::d3(3, 1, 2), 4, 1).unwrap();
        assert_eq!(l.cstep, 4);
        assert_eq!(l.required_bytes().unwrap(), 32);

        // packed f32x4 slots are already 16 bytes
        let l = MatLayout::new(Shape::d3(3, 1, 2), 16, 4).unwrap();
        assert_eq!(l.cstep, 3);

        // int8: 5 bytes -> 16
        let l = MatLayout::new(Shape::d4(5, 1, 1, 3), 1, 1).unwrap();
        assert_eq!(l.cstep, 16);
    }

    #[test]
    fn test_invalid_layouts() {
        let bad_rank = Shape {
            dims: 5,
            w: 1,
            h: 1,
            d: 1,
            c: 1,
        };
        assert!(matches!(
            MatLayout::new(bad_rank, 4, 1),
            Err(MatError::InvalidShape { dims: 5 })
        ));
        assert!(matches!(
            MatLayout::new(Shape::d1(4), 6, 4),
            Err(MatError::InvalidPack { .. })
        ));
        assert!(matches!(
            MatLayout::new(Shape::d1(4), 4, 0),
            Err(MatError::InvalidPack { .. })
        ));
    }

    #[test]
    fn test_from_packed_skips_channel_gap() {
        let values: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let m = Mat::from_packed(Shape::d3(3, 1, 2), 1, &values).unwrap();
        assert_eq!(m.cstep(), 4);
        assert_eq!(
            m.as_slice::<f32>().unwrap(),
            &[0.0, 1.0, 2.0, 0.0, 3.0, 4.0, 5.0, 0.0]
        );
        assert_eq!(m.channel::<f32>(1).unwrap(), &[3.0, 4.0, 5.0]);
        assert_eq!(m.to_packed::<f32>().unwrap(), values);
    }

    #[test]
    fn test_from_packed_length_mismatch() {
        let err = Mat::from_packed(Shape::d2(2, 2), 1, &[1i8, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            MatError::LengthMismatch {
                expected: 4,
                found: 3
            }
        ));
    }

    #[test]
    fn test_clone_aliases_and_blocks_mutation() {
        let mut a = Mat::from_packed(Shape::d1(4), 1, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let b = a.clone();
        assert!(a.shares_storage(&b));
        assert!(matches!(
            a.as_mut_slice::<f32>(),
            Err(MatError::SharedStorage)
        ));
        drop(b);
        a.as_mut_slice::<f32>().unwrap()[0] = 9.0;
        assert_eq!(a.row::<f32>(0).unwrap()[0], 9.0);
    }

    #[test]
    fn test_element_mismatch() {
        let m = Mat::from_packed(Shape::d1(2), 4, &[0.0f32; 8]).unwrap();
        assert_eq!(m.elemsize(), 16);
        assert_eq!(m.elembits(), 32);
        assert!(matches!(
            m.as_slice::<i8>(),
            Err(MatError::ElementMismatch {
                lane: 4,
                requested: 1
            })
        ));
    }

    #[test]
    fn test_lane_width_selects_element_type() {
        // 8 x i8 slots: any 8-bit element type reads it, wider ones do not
        let m = Mat::from_packed(Shape::d1(1), 8, &[1i8, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(m.elembits(), <i8 as Element>::BITS);
        assert_eq!(m.as_slice::<u8>().unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(matches!(
            m.as_slice::<u64>(),
            Err(MatError::ElementMismatch {
                lane: 1,
                requested: 8
            })
        ));
        assert!(matches!(
            m.channel::<u16>(0),
            Err(MatError::ElementMismatch {
                lane: 1,
                requested: 2
            })
        ));
    }

    #[test]
    fn test_view_as() {
        let m = Mat::from_packed(Shape::d1(8), 1, &[0i8; 8]).unwrap();
        let layout = MatLayout::new(Shape::d1(1), 8, 8).unwrap();
        let v = m.view_as(layout).unwrap();
        assert!(v.shares_storage(&m));
        assert_eq!(v.elempack(), 8);

        let too_big = MatLayout::new(Shape::d1(2), 8, 8).unwrap();
        assert!(matches!(
            m.view_as(too_big),
            Err(MatError::LayoutTooLarge {
                needed: 16,
                available: 8
            })
        ));
    }

    #[test]
    fn test_create_allocation_failure() {
        let err = Mat::create(Shape::d2(16, 16), 4, 1, &LimitedAllocator::new(64)).unwrap_err();
        assert!(matches!(err, MatError::AllocationFailed { bytes: 1024 }));
    }

    #[test]
    fn test_row_bounds() {
        let m = Mat::from_packed(Shape::d2(2, 2), 1, &[1u8, 2, 3, 4]).unwrap();
        assert_eq!(m.row::<u8>(1).unwrap(), &[3, 4]);
        assert!(matches!(
            m.row::<u8>(2),
            Err(MatError::OutOfBounds {
                index: 2,
                extent: 2
            })
        ));
    }
}
