use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tracing::{debug, info, trace};

use crate::{
    error::{Error, Result},
    graphics::{backend::Backend, device::Device, fence::Fence},
};

use super::frame_resource::{FrameResource, FrameResourceDesc};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingStats {
    pub rotations: u64,
    pub waits: u64,
    pub blocked: Duration,
}

/// Fixed ring of frame resources.
///
/// The CPU records into the current slot while the GPU consumes older ones.
/// [`FrameRing::advance`] is the only place the CPU blocks: it waits for the
/// GPU to retire the slot it is about to hand out, which bounds the CPU lead
/// to `len() - 1` frames.
pub struct FrameRing<B: Backend> {
    frames: SmallVec<[FrameResource<B>; 3]>,
    cursor: usize,
    fence: Fence<B>,
    wait_timeout: Option<Duration>,
    stats: RingStats,
}

impl<B: Backend> FrameRing<B> {
    pub fn new(
        device: &Device<B>,
        fence: Fence<B>,
        len: usize,
        desc: &FrameResourceDesc,
        wait_timeout: Option<Duration>,
    ) -> Result<Self> {
        if len == 0 {
            return Err(Error::Config("a frame ring needs at least one slot".into()));
        }

        let frames = (0..len)
            .map(|_| FrameResource::new(device, desc))
            .collect::<Result<SmallVec<_>>>()?;

        info!(len, ?desc, "frame ring created");

        Ok(Self {
            frames,
            // The first advance lands on slot 0.
            cursor: len - 1,
            fence,
            wait_timeout,
            stats: RingStats::default(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn fence(&self) -> &Fence<B> {
        &self.fence
    }

    pub fn stats(&self) -> RingStats {
        self.stats
    }

    pub fn current(&self) -> &FrameResource<B> {
        &self.frames[self.cursor]
    }

    pub fn current_mut(&mut self) -> &mut FrameResource<B> {
        &mut self.frames[self.cursor]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameResource<B>> {
        self.frames.iter()
    }

    /// Rotates to the next slot, blocking until the GPU is done with it.
    ///
    /// A slot that was never submitted is handed out immediately. If the
    /// wait fails the cursor stays where it was.
    pub fn advance(&mut self) -> Result<&mut FrameResource<B>> {
        let next = (self.cursor + 1) % self.frames.len();
        let fence_value = self.frames[next].fence_value();

        if fence_value != 0 && !self.fence.is_complete(fence_value) {
            debug!(
                slot = next,
                fence_value,
                completed = self.fence.get_completed_value(),
                "waiting for GPU to release frame resource"
            );

            let started = Instant::now();
            self.fence.wait_on_cpu(fence_value, self.wait_timeout)?;
            self.stats.waits += 1;
            self.stats.blocked += started.elapsed();
        }

        self.cursor = next;
        self.stats.rotations += 1;
        trace!(slot = next, "frame resource acquired");

        Ok(&mut self.frames[next])
    }
}
