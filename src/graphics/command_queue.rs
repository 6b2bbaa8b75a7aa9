use std::sync::Arc;

use tracing::trace;

use crate::error::{CommandListState, Error, Result};

use super::{
    backend::{Backend, RawDevice, RawQueue},
    command_list::CommandList,
    device::Device,
    fence::Fence,
};

/// The single direct queue. Work executes in submission order.
pub struct CommandQueue<B: Backend>(Arc<CommandQueueInner<B>>);

impl<B: Backend> Clone for CommandQueue<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

pub struct CommandQueueInner<B: Backend> {
    pub(super) raw: B::Queue,
}

impl<B: Backend> CommandQueue<B> {
    pub(super) fn inner_new(device: &Device<B>) -> Result<Self> {
        let raw = device.raw.create_queue()?;

        Ok(Self(Arc::new(CommandQueueInner { raw })))
    }

    pub fn execute(&self, list: &CommandList<B>) -> Result<()> {
        if list.state() != CommandListState::Closed {
            return Err(Error::CommandListState {
                expected: CommandListState::Closed,
                found: list.state(),
            });
        }

        self.0.raw.execute(list.raw())
    }

    pub fn signal(&self, fence: &Fence<B>, value: u64) -> Result<()> {
        trace!(value, "signal");
        self.0.raw.signal(fence.raw(), value)
    }

    pub fn raw(&self) -> &B::Queue {
        &self.0.raw
    }
}
