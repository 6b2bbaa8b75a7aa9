use std::marker::PhantomData;

use tracing::debug;

use crate::error::Result;

use super::{
    backend::{Backend, RawBuffer, RawDevice},
    device::Device,
    utils::{align, NonNullSend, CONSTANT_BUFFER_ALIGNMENT},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Elements padded to the 256-byte constant buffer granularity.
    Constant,
    /// Elements tightly packed.
    Upload,
}

impl BufferUsage {
    pub const fn element_stride(self, element_size: usize) -> usize {
        match self {
            BufferUsage::Constant => align(element_size, CONSTANT_BUFFER_ALIGNMENT),
            BufferUsage::Upload => element_size,
        }
    }
}

/// Persistently mapped, CPU-writable array of `T` in an upload heap.
///
/// The buffer does not synchronize with the GPU: writing an element the GPU
/// may still read is prevented by the frame ring, not here.
pub struct UploadBuffer<T: Copy, B: Backend> {
    raw: Option<B::Buffer>,
    mapped: Option<NonNullSend<u8>>,
    stride: usize,
    len: usize,
    copies: u64,
    _marker: PhantomData<T>,
}

impl<T: Copy, B: Backend> UploadBuffer<T, B> {
    pub(super) fn inner_new(device: &Device<B>, len: usize, usage: BufferUsage) -> Result<Self> {
        let stride = usage.element_stride(size_of::<T>());
        let raw = device.raw.create_upload_buffer(stride * len)?;
        let mapped = raw.map()?;

        debug!(
            element = std::any::type_name::<T>(),
            len,
            stride,
            "upload buffer mapped"
        );

        Ok(Self {
            raw: Some(raw),
            mapped: Some(mapped.into()),
            stride,
            len,
            copies: 0,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn copy_count(&self) -> u64 {
        self.copies
    }

    pub fn raw(&self) -> Option<&B::Buffer> {
        self.raw.as_ref()
    }

    pub fn gpu_address(&self, index: usize) -> u64 {
        self.check_index(index);
        let base = self.raw.as_ref().map_or(0, RawBuffer::gpu_address);
        base + (index * self.stride) as u64
    }

    pub fn copy_data(&mut self, index: usize, value: &T) {
        self.check_index(index);
        let dst = self.element_ptr(index);

        unsafe {
            std::ptr::copy_nonoverlapping(
                (value as *const T).cast::<u8>(),
                dst,
                size_of::<T>(),
            );
        }

        self.copies += 1;
    }

    pub fn read(&self, index: usize) -> T {
        self.check_index(index);
        let src = self.element_ptr(index);

        unsafe { std::ptr::read_unaligned(src.cast::<T>()) }
    }

    /// Unmaps and hands back the underlying resource. Later accesses panic.
    pub fn release(&mut self) -> Option<B::Buffer> {
        let raw = self.raw.take()?;

        if self.mapped.take().is_some() {
            raw.unmap();
        }

        Some(raw)
    }

    fn element_ptr(&self, index: usize) -> *mut u8 {
        let Some(mapped) = self.mapped else {
            panic!(
                "UploadBuffer<{}>: access after release",
                std::any::type_name::<T>()
            );
        };

        unsafe { mapped.as_ptr().add(index * self.stride) }
    }

    fn check_index(&self, index: usize) {
        if index >= self.len {
            panic!(
                "UploadBuffer<{}>: index {} out of bounds, length: {}",
                std::any::type_name::<T>(),
                index,
                self.len
            );
        }
    }
}

impl<T: Copy, B: Backend> Drop for UploadBuffer<T, B> {
    fn drop(&mut self) {
        self.release();
    }
}
