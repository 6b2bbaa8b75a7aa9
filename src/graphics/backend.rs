//! The boundary between the frame synchronization core and a GPU API.
//!
//! A backend supplies the handful of device objects the core needs: a
//! single direct queue, fences with completion events, command allocators
//! and lists, persistently mapped upload memory and a swap chain. Every
//! fallible call returns [`crate::Result`] so failures propagate unchanged.

use std::{ptr::NonNull, time::Duration};

use crate::error::Result;

pub trait Backend: Sized + Send + Sync + 'static {
    type Device: RawDevice<Self>;
    type Queue: RawQueue<Self>;
    type Fence: RawFence<Self>;
    type Event: RawEvent;
    type Allocator: RawAllocator;
    type CommandList: RawCommandList<Self>;
    type Buffer: RawBuffer;
    type Swapchain: RawSwapchain;
}

pub trait RawDevice<B: Backend>: Clone + Send + Sync {
    fn create_queue(&self) -> Result<B::Queue>;
    fn create_fence(&self, initial_value: u64) -> Result<B::Fence>;
    fn create_event(&self) -> Result<B::Event>;
    fn create_command_allocator(&self) -> Result<B::Allocator>;
    /// The list is returned open for recording against `allocator`.
    fn create_command_list(&self, allocator: &B::Allocator) -> Result<B::CommandList>;
    fn create_upload_buffer(&self, byte_size: usize) -> Result<B::Buffer>;
}

pub trait RawQueue<B: Backend>: Send + Sync {
    fn execute(&self, list: &B::CommandList) -> Result<()>;
    /// Enqueues a GPU-side write of `value` to `fence`, ordered after all
    /// previously submitted work.
    fn signal(&self, fence: &B::Fence, value: u64) -> Result<()>;
}

pub trait RawFence<B: Backend>: Send + Sync {
    fn completed_value(&self) -> u64;
    fn set_event_on_completion(&self, value: u64, event: &B::Event) -> Result<()>;
}

pub trait RawEvent: Send + Sync {
    /// Blocks until the event fires. Returns `false` if `timeout` elapsed first.
    fn wait(&self, timeout: Option<Duration>) -> Result<bool>;
}

pub trait RawAllocator: Send {
    fn reset(&self) -> Result<()>;
}

pub trait RawCommandList<B: Backend>: Send {
    fn reset(&self, allocator: &B::Allocator) -> Result<()>;
    fn close(&self) -> Result<()>;
}

pub trait RawBuffer: Send {
    fn size(&self) -> usize;
    fn gpu_address(&self) -> u64;
    fn map(&self) -> Result<NonNull<u8>>;
    fn unmap(&self);
}

pub trait RawSwapchain: Send {
    fn buffer_count(&self) -> usize;
    fn current_back_buffer_index(&self) -> usize;
    fn present(&self) -> Result<()>;
}
