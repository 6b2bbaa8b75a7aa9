use std::{ops::Deref, sync::Arc};

use tracing::info;

use crate::error::Result;

use super::{
    backend::Backend,
    command_allocator::CommandAllocator,
    command_list::CommandList,
    command_queue::CommandQueue,
    fence::Fence,
    swapchain::Swapchain,
    upload_buffer::{BufferUsage, UploadBuffer},
};

pub struct Device<B: Backend>(Arc<DeviceInner<B>>);

impl<B: Backend> Clone for Device<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<B: Backend> Deref for Device<B> {
    type Target = DeviceInner<B>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub struct DeviceInner<B: Backend> {
    name: String,
    pub(super) raw: B::Device,
}

impl<B: Backend> Device<B> {
    pub fn new(name: impl Into<String>, raw: B::Device) -> Self {
        let name = name.into();
        info!(device = %name, "graphics device opened");

        Self(Arc::new(DeviceInner { name, raw }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &B::Device {
        &self.raw
    }
}

impl<B: Backend> Device<B> {
    pub fn create_command_queue(&self) -> Result<CommandQueue<B>> {
        CommandQueue::inner_new(self)
    }

    pub fn create_fence(&self) -> Result<Fence<B>> {
        Fence::inner_new(self)
    }

    pub fn create_command_allocator(&self) -> Result<CommandAllocator<B>> {
        CommandAllocator::inner_new(self)
    }

    pub fn create_command_list(&self, allocator: &CommandAllocator<B>) -> Result<CommandList<B>> {
        CommandList::inner_new(self, allocator)
    }

    pub fn create_upload_buffer<T: Copy>(
        &self,
        len: usize,
        usage: BufferUsage,
    ) -> Result<UploadBuffer<T, B>> {
        UploadBuffer::inner_new(self, len, usage)
    }

    pub fn create_constant_buffer<T: Copy>(&self, len: usize) -> Result<UploadBuffer<T, B>> {
        UploadBuffer::inner_new(self, len, BufferUsage::Constant)
    }

    pub fn create_swapchain(&self, raw: B::Swapchain) -> Swapchain<B> {
        Swapchain::inner_new(raw)
    }
}
