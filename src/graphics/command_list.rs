use tracing::error;

use crate::error::{CommandListState, Error, Result};

use super::{
    backend::{Backend, RawCommandList, RawDevice},
    command_allocator::CommandAllocator,
    device::Device,
};

pub struct CommandList<B: Backend> {
    raw: B::CommandList,
    state: CommandListState,
}

impl<B: Backend> CommandList<B> {
    pub(super) fn inner_new(device: &Device<B>, allocator: &CommandAllocator<B>) -> Result<Self> {
        let raw = device.raw.create_command_list(&allocator.raw)?;
        raw.close()?;

        Ok(Self {
            raw,
            state: CommandListState::Closed,
        })
    }

    pub fn state(&self) -> CommandListState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CommandListState::Recording
    }

    pub fn reset(&mut self, allocator: &CommandAllocator<B>) -> Result<()> {
        self.ensure_state(CommandListState::Closed)?;
        self.raw.reset(&allocator.raw)?;
        self.state = CommandListState::Recording;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.ensure_state(CommandListState::Recording)?;
        // A failed close still leaves nothing to record into.
        self.state = CommandListState::Closed;
        self.raw.close()
    }

    /// Closes the list if it is still open, logging rather than returning
    /// a failure. Used on error paths so the list is never left recording.
    pub fn close_after_error(&mut self) {
        if self.is_recording() {
            if let Err(err) = self.close() {
                error!(%err, "failed to close command list after an error");
            }
        }
    }

    pub fn raw(&self) -> &B::CommandList {
        &self.raw
    }

    fn ensure_state(&self, expected: CommandListState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::CommandListState {
                expected,
                found: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::CommandListState,
        graphics::soft::{SoftCommand, SoftDevice},
        Error,
    };

    #[test]
    fn state_follows_reset_and_close() {
        let device = SoftDevice::manual().unwrap().into_device();
        let allocator = device.create_command_allocator().unwrap();
        let mut list = device.create_command_list(&allocator).unwrap();

        assert_eq!(list.state(), CommandListState::Closed);
        assert!(list.close().is_err());

        list.reset(&allocator).unwrap();
        assert!(list.is_recording());
        assert!(matches!(
            list.reset(&allocator),
            Err(Error::CommandListState {
                expected: CommandListState::Closed,
                found: CommandListState::Recording,
            })
        ));

        list.raw()
            .record(SoftCommand::SetPipelineState("opaque".into()))
            .unwrap();
        list.close_after_error();
        assert_eq!(list.state(), CommandListState::Closed);
        assert_eq!(list.raw().commands().len(), 1);
    }
}
