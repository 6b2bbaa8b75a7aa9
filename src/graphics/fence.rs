use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{
    backend::{Backend, RawDevice, RawEvent, RawFence},
    device::Device,
};

/// Waits longer than this are reported as stalls.
const STALL_WARNING: Duration = Duration::from_millis(100);

/// CPU/GPU shared completion counter.
///
/// The fence only observes progress; the value to signal next is owned by
/// whoever submits work (see [`crate::renderer::Renderer`]).
pub struct Fence<B: Backend>(Arc<FenceInner<B>>);

impl<B: Backend> Clone for Fence<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

pub struct FenceInner<B: Backend> {
    device: Device<B>,
    pub(super) raw: B::Fence,
}

impl<B: Backend> Fence<B> {
    pub(super) fn inner_new(device: &Device<B>) -> Result<Self> {
        let raw = device.raw.create_fence(0)?;

        Ok(Self(Arc::new(FenceInner {
            device: device.clone(),
            raw,
        })))
    }

    pub fn get_completed_value(&self) -> u64 {
        self.0.raw.completed_value()
    }

    pub fn is_complete(&self, value: u64) -> bool {
        self.get_completed_value() >= value
    }

    /// Blocks until the GPU has reached `value`, never spinning.
    ///
    /// Returns [`Error::FenceTimeout`] when `timeout` elapses first.
    pub fn wait_on_cpu(&self, value: u64, timeout: Option<Duration>) -> Result<()> {
        if self.is_complete(value) {
            return Ok(());
        }

        let event = self
            .0
            .device
            .raw
            .create_event()
            .map_err(|err| wait_error(value, err))?;
        self.0
            .raw
            .set_event_on_completion(value, &event)
            .map_err(|err| wait_error(value, err))?;

        let started = Instant::now();
        let signaled = event.wait(timeout).map_err(|err| wait_error(value, err))?;
        let waited = started.elapsed();

        if !signaled {
            return Err(Error::FenceTimeout {
                value,
                completed: self.get_completed_value(),
                timeout: timeout.unwrap_or(waited),
            });
        }

        if waited > STALL_WARNING {
            warn!(value, ?waited, "long stall waiting for the GPU");
        } else {
            debug!(value, ?waited, "fence reached");
        }

        Ok(())
    }

    pub fn raw(&self) -> &B::Fence {
        &self.0.raw
    }
}

fn wait_error(value: u64, err: Error) -> Error {
    match err {
        Error::DeviceRemoved => Error::DeviceRemoved,
        other => Error::FenceWait {
            value,
            message: other.to_string(),
        },
    }
}
