use tracing::trace;

use crate::error::Result;

use super::backend::{Backend, RawSwapchain};

pub struct Swapchain<B: Backend> {
    raw: B::Swapchain,
    buffer_count: usize,
    current_back_buffer: usize,
    presented: u64,
}

impl<B: Backend> Swapchain<B> {
    pub(super) fn inner_new(raw: B::Swapchain) -> Self {
        let buffer_count = raw.buffer_count();
        let current_back_buffer = raw.current_back_buffer_index();

        Self {
            raw,
            buffer_count,
            current_back_buffer,
            presented: 0,
        }
    }

    pub fn current_back_buffer(&self) -> usize {
        self.current_back_buffer
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn present(&mut self) -> Result<()> {
        self.raw.present()?;
        self.presented += 1;
        self.current_back_buffer = (self.current_back_buffer + 1) % self.buffer_count;

        debug_assert_eq!(
            self.current_back_buffer,
            self.raw.current_back_buffer_index(),
            "swap chain back buffer index diverged"
        );
        trace!(back_buffer = self.current_back_buffer, "present");

        Ok(())
    }

    pub fn raw(&self) -> &B::Swapchain {
        &self.raw
    }
}
