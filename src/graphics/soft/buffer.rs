use std::{
    alloc::{self, Layout},
    ptr::NonNull,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::{error::Result, graphics::backend::RawBuffer, graphics::utils::CONSTANT_BUFFER_ALIGNMENT};

struct Memory {
    ptr: NonNull<u8>,
    layout: Layout,
}

// Plain heap memory; access is coordinated by the owning upload buffer.
unsafe impl Send for Memory {}
unsafe impl Sync for Memory {}

impl Drop for Memory {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

pub struct SoftBuffer {
    memory: Arc<Memory>,
    size: usize,
    address: u64,
    maps: Arc<AtomicU64>,
    unmaps: Arc<AtomicU64>,
}

impl SoftBuffer {
    pub(super) fn new(size: usize, address: u64) -> Option<Self> {
        let layout = Layout::from_size_align(size.max(1), CONSTANT_BUFFER_ALIGNMENT).ok()?;
        let ptr = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })?;

        Some(Self {
            memory: Arc::new(Memory { ptr, layout }),
            size,
            address,
            maps: Default::default(),
            unmaps: Default::default(),
        })
    }

    pub fn map_count(&self) -> u64 {
        self.maps.load(Ordering::Acquire)
    }

    pub fn unmap_count(&self) -> u64 {
        self.unmaps.load(Ordering::Acquire)
    }
}

impl RawBuffer for SoftBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn gpu_address(&self) -> u64 {
        self.address
    }

    fn map(&self) -> Result<NonNull<u8>> {
        self.maps.fetch_add(1, Ordering::AcqRel);
        Ok(self.memory.ptr)
    }

    fn unmap(&self) {
        self.unmaps.fetch_add(1, Ordering::AcqRel);
    }
}
