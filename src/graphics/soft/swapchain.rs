use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use crate::{
    error::{Error, Result},
    graphics::backend::RawSwapchain,
};

use super::timeline::Timeline;

pub struct SoftSwapchain {
    timeline: Arc<Timeline>,
    buffer_count: usize,
    current: AtomicUsize,
    fail_next_present: AtomicBool,
}

impl SoftSwapchain {
    pub(super) fn new(timeline: Arc<Timeline>, buffer_count: usize) -> Result<Self> {
        if buffer_count < 2 {
            return Err(Error::device(
                "create_swapchain",
                format!("a swap chain needs at least 2 buffers, got {buffer_count}"),
            ));
        }

        Ok(Self {
            timeline,
            buffer_count,
            current: AtomicUsize::new(0),
            fail_next_present: AtomicBool::new(false),
        })
    }

    /// Makes the next `present` fail without flipping the back buffer.
    pub fn fail_next_present(&self) {
        self.fail_next_present.store(true, Ordering::Release);
    }
}

impl RawSwapchain for SoftSwapchain {
    fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    fn current_back_buffer_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    fn present(&self) -> Result<()> {
        self.timeline.check_ready()?;

        if self.fail_next_present.swap(false, Ordering::AcqRel) {
            return Err(Error::device("present", "swap chain rejected the frame"));
        }

        let next = (self.current.load(Ordering::Acquire) + 1) % self.buffer_count;
        self.current.store(next, Ordering::Release);
        Ok(())
    }
}
