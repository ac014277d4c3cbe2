//! Storage allocation for mats.
//!
//! An [`Allocator`] hands out zero-filled, 16-byte aligned [`Buffer`]s and
//! reports exhaustion by returning `None` instead of aborting.

use bytemuck::{Pod, Zeroable};

use crate::{MatError, Result, CHANNEL_ALIGN};

/// One 16-byte aligned storage unit.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
struct Chunk([u8; CHANNEL_ALIGN]);

/// Zero-initialised, 16-byte aligned byte storage.
#[derive(Clone, Default)]
pub struct Buffer {
    chunks: Vec<Chunk>,
    len: usize,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer").field("len", &self.len).finish()
    }
}

impl Buffer {
    /// Allocate `bytes` zeroed bytes, or `None` if the heap refuses.
    pub fn zeroed(bytes: usize) -> Option<Self> {
        let n = bytes.div_ceil(CHANNEL_ALIGN);
        let mut chunks = Vec::new();
        chunks.try_reserve_exact(n).ok()?;
        chunks.resize(n, Chunk::default());
        Some(Self { chunks, len: bytes })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<Chunk, u8>(&self.chunks)[..self.len]
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<Chunk, u8>(&mut self.chunks)[..self.len]
    }

    pub(crate) fn cast<T: bytemuck::Pod>(&self) -> Result<&[T]> {
        let all = bytemuck::try_cast_slice::<Chunk, T>(&self.chunks).map_err(MatError::Cast)?;
        Ok(&all[..self.len / std::mem::size_of::<T>()])
    }

    pub(crate) fn cast_mut<T: bytemuck::Pod>(&mut self) -> Result<&mut [T]> {
        let len = self.len / std::mem::size_of::<T>();
        let all =
            bytemuck::try_cast_slice_mut::<Chunk, T>(&mut self.chunks).map_err(MatError::Cast)?;
        Ok(&mut all[..len])
    }
}

/// Source of mat storage.
///
/// Returning `None` signals exhaustion; callers turn it into
/// [`MatError::AllocationFailed`].
pub trait Allocator: Send + Sync + std::fmt::Debug {
    fn allocate(&self, bytes: usize) -> Option<Buffer>;
}

/// Global-heap allocator. Fails only when the heap does.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl Allocator for HeapAllocator {
    fn allocate(&self, bytes: usize) -> Option<Buffer> {
        Buffer::zeroed(bytes)
    }
}

/// Heap allocator that refuses any single request above `max_bytes`.
#[derive(Debug, Clone, Copy)]
pub struct LimitedAllocator {
    max_bytes: usize,
}

impl LimitedAllocator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    #[inline]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

impl Allocator for LimitedAllocator {
    fn allocate(&self, bytes: usize) -> Option<Buffer> {
        if bytes > self.max_bytes {
            log::warn!(
                "allocation of {bytes} bytes refused (limit {})",
                self.max_bytes
            );
            return None;
        }
        Buffer::zeroed(bytes)
    }
}
