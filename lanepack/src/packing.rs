//! The packing layer: classification, dispatch and the native transforms.

use lanepack_mat::{Mat, MatError, Shape};

use crate::execute::{pack_1_to_k, unpack_k_to_1, PlaneGeometry};
use crate::fallback::pack_generic;
use crate::kernel::PackLane;
use crate::plan::{
    check_out_elempack, classify, is_divisible, output_layout, NumericKind, TransformKind,
};
use crate::{Options, RepackError, Result};

/// Packing layer parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packing {
    /// Requested lane-pack factor of the output.
    pub out_elempack: usize,
    /// Allow padding the packed axis up to a multiple of `out_elempack`.
    pub use_padding: bool,
}

impl Packing {
    pub fn new(out_elempack: usize) -> Self {
        Self {
            out_elempack,
            use_padding: false,
        }
    }

    pub fn with_padding(mut self, use_padding: bool) -> Self {
        self.use_padding = use_padding;
        self
    }

    /// Repack `bottom`. The result either aliases `bottom` or is a freshly
    /// allocated mat owned by the caller; `bottom` itself is never written.
    pub fn forward(&self, bottom: &Mat, opt: &Options) -> Result<Mat> {
        check_out_elempack(bottom.layout(), self.out_elempack)?;
        match NumericKind::of(bottom) {
            NumericKind::F32 => self.forward_native::<f32>(bottom, opt),
            NumericKind::I8 => self.forward_native::<i8>(bottom, opt),
            NumericKind::Other(bits) => {
                log::debug!("no native path for {bits}-bit scalars, using generic pack");
                pack_generic(bottom, self.out_elempack, self.use_padding, opt)
            }
        }
    }

    fn forward_native<T: PackLane>(&self, bottom: &Mat, opt: &Options) -> Result<Mat> {
        let layout = *bottom.layout();
        let elempack = layout.elempack;
        let out_elempack = self.out_elempack;

        let kind = classify(T::KIND, elempack, out_elempack, self.use_padding);
        match kind {
            TransformKind::Unsupported => {
                log::debug!(
                    "{:?} pack {elempack} -> {out_elempack} (padding={}) delegated to generic pack",
                    T::KIND,
                    self.use_padding
                );
                return pack_generic(bottom, out_elempack, self.use_padding, opt);
            }
            TransformKind::Identity => return Ok(bottom.clone()),
            TransformKind::Pack1toK | TransformKind::PackKto1 => {}
        }

        if !self.use_padding && !is_divisible(&layout, out_elempack) {
            log::debug!(
                "repack to {out_elempack} skipped: packed axis of dims={} mat not divisible",
                layout.shape.dims
            );
            return Ok(bottom.clone());
        }

        let out_layout = output_layout(&layout, out_elempack)?;
        if layout.shape.dims == 1 {
            log::trace!("dims=1 reinterpretation: w {} -> {}", layout.shape.w, out_layout.shape.w);
            return Ok(bottom.view_as(out_layout)?);
        }

        let mut top = allocate(out_layout.shape, out_layout.elemsize, out_elempack, opt)?;

        let shape = layout.shape;
        let (src_plane, dst_plane, inner) = if shape.dims == 2 {
            (shape.w, shape.w, shape.w)
        } else {
            (layout.cstep, out_layout.cstep, shape.size())
        };
        let g = PlaneGeometry {
            src_stride: src_plane * elempack,
            dst_stride: dst_plane * out_elempack,
            inner,
        };
        log::trace!(
            "{kind:?} {:?}: dims={} inner={inner} threads={} simd={}",
            T::KIND,
            shape.dims,
            opt.num_threads,
            opt.use_simd
        );

        let src = bottom.as_slice::<T>()?;
        let dst = top.as_mut_slice::<T>()?;
        match kind {
            TransformKind::Pack1toK => pack_1_to_k(src, dst, g, opt),
            _ => unpack_k_to_1(src, dst, g, opt),
        }
        Ok(top)
    }
}

/// Repack `bottom` to `out_elempack` with default options and the given
/// worker count.
pub fn repack(
    bottom: &Mat,
    out_elempack: usize,
    use_padding: bool,
    num_threads: usize,
) -> Result<Mat> {
    let opt = Options::default().with_num_threads(num_threads);
    Packing::new(out_elempack)
        .with_padding(use_padding)
        .forward(bottom, &opt)
}

/// Allocate a destination mat through `opt.blob_allocator`.
pub(crate) fn allocate(
    shape: Shape,
    elemsize: usize,
    elempack: usize,
    opt: &Options,
) -> Result<Mat> {
    Mat::create(shape, elemsize, elempack, opt.blob_allocator.as_ref()).map_err(|err| {
        if let MatError::AllocationFailed { bytes } = err {
            log::warn!("repack destination allocation of {bytes} bytes failed");
        }
        RepackError::from(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_aliases() {
        let m = Mat::from_packed(Shape::d2(3, 4), 4, &[1.0f32; 48]).unwrap();
        let out = Packing::new(4).forward(&m, &Options::default()).unwrap();
        assert!(out.shares_storage(&m));
    }

    #[test]
    fn test_concrete_rows_example() {
        let rows = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let m = Mat::from_packed(Shape::d2(2, 4), 1, &rows).unwrap();
        let opt = Options::default().with_num_threads(1);

        let packed = Packing::new(4).forward(&m, &opt).unwrap();
        assert_eq!(packed.shape(), Shape::d2(2, 1));
        assert_eq!(packed.elemsize(), 16);
        assert_eq!(
            packed.row::<f32>(0).unwrap(),
            &[1.0, 3.0, 5.0, 7.0, 2.0, 4.0, 6.0, 8.0]
        );

        let back = Packing::new(1).forward(&packed, &opt).unwrap();
        assert_eq!(back.shape(), Shape::d2(2, 4));
        assert_eq!(back.to_packed::<f32>().unwrap(), rows);
    }

    #[test]
    fn test_zero_out_elempack_is_an_error() {
        let m = Mat::from_packed(Shape::d2(2, 4), 1, &[0.0f32; 8]).unwrap();
        for padding in [false, true] {
            let err = Packing::new(0)
                .with_padding(padding)
                .forward(&m, &Options::default())
                .unwrap_err();
            assert!(matches!(
                err,
                RepackError::Mat(MatError::InvalidPack { elempack: 0, .. })
            ));
        }
    }

    #[test]
    fn test_padding_request_goes_generic() {
        let m = Mat::from_packed(Shape::d2(1, 6), 1, &[1i8, 2, 3, 4, 5, 6]).unwrap();
        let out = Packing::new(8)
            .with_padding(true)
            .forward(&m, &Options::default())
            .unwrap();
        assert_eq!(out.h(), 1);
        assert_eq!(out.row::<i8>(0).unwrap(), &[1, 2, 3, 4, 5, 6, 0, 0]);
    }
}
