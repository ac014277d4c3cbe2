//! Scalar types a [`Mat`](crate::Mat) can be viewed as.

/// A plain-old-data scalar that can be read from or written to mat storage.
///
/// The byte width of `Self` must equal the mat's lane width
/// (`elemsize / elempack`) for typed access to succeed.
pub trait Element: bytemuck::Pod + Send + Sync + std::fmt::Debug + 'static {
    /// Bit width of one scalar, compared against [`Mat::elembits`](crate::Mat::elembits).
    const BITS: usize = std::mem::size_of::<Self>() * 8;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(impl Element for $t {})*
    };
}

impl_element!(f32, f64, i8, u8, i16, u16, i32, u32, i64, u64);
