use crate::error::Result;

use super::{
    backend::{Backend, RawAllocator, RawDevice},
    device::Device,
};

/// Backing memory for recorded commands.
///
/// Must not be reset while any list recorded into it may still be executing.
pub struct CommandAllocator<B: Backend> {
    pub(super) raw: B::Allocator,
}

impl<B: Backend> CommandAllocator<B> {
    pub(super) fn inner_new(device: &Device<B>) -> Result<Self> {
        let raw = device.raw.create_command_allocator()?;

        Ok(Self { raw })
    }

    pub fn reset(&self) -> Result<()> {
        self.raw.reset()
    }

    pub fn raw(&self) -> &B::Allocator {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::CommandAllocator;
    use crate::graphics::soft::SoftBackend;

    const fn is_send<T: Send>() {}

    const _: () = is_send::<CommandAllocator<SoftBackend>>();
}
