//! Software backend.
//!
//! The "GPU" is a FIFO timeline of submitted command lists and fence
//! signals. It either runs on a background thread with a configurable
//! per-list latency, or is stepped by hand so tests can hold the GPU at an
//! exact point. Misuse a driver debug layer would catch (resetting an
//! allocator whose lists are still queued, executing an open list) is
//! reported as an error.

mod buffer;
mod commands;
mod fence;
mod swapchain;
mod timeline;

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, error};

pub use buffer::SoftBuffer;
pub use commands::{SoftAllocator, SoftCommand, SoftCommandList};
pub use fence::{SoftEvent, SoftFence};
pub use swapchain::SoftSwapchain;
pub use timeline::{DeviceStatus, ExecutionLog, SoftGpu, SoftQueue};

use timeline::Timeline;

use crate::{
    error::{Error, Result},
    graphics::{
        backend::{Backend, RawDevice},
        device::Device,
    },
};

const GPU_ADDRESS_BASE: u64 = 0x1_0000_0000;
const GPU_ADDRESS_GRANULARITY: u64 = 64 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct SoftBackend;

impl Backend for SoftBackend {
    type Device = SoftDevice;
    type Queue = SoftQueue;
    type Fence = SoftFence;
    type Event = SoftEvent;
    type Allocator = SoftAllocator;
    type CommandList = SoftCommandList;
    type Buffer = SoftBuffer;
    type Swapchain = SoftSwapchain;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Nothing executes until [`SoftGpu::step`] is called.
    Manual,
    /// A worker thread drains the timeline, spending `latency` plus up to
    /// `jitter` on every command list.
    Threaded { latency: Duration, jitter: Duration },
}

#[derive(Clone)]
pub struct SoftDevice(Arc<SoftDeviceInner>);

struct SoftDeviceInner {
    timeline: Arc<Timeline>,
    next_address: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SoftDevice {
    /// Fails if the threaded mode cannot start its GPU thread.
    pub fn new(mode: ExecutionMode) -> Result<Self> {
        let timeline = Arc::new(Timeline::new());

        let worker = match mode {
            ExecutionMode::Manual => None,
            ExecutionMode::Threaded { latency, jitter } => {
                let timeline = Arc::clone(&timeline);
                let handle = std::thread::Builder::new()
                    .name("soft-gpu".into())
                    .spawn(move || timeline.run(latency, jitter))
                    .map_err(|err| Error::device("spawn_gpu_thread", err.to_string()))?;
                Some(handle)
            }
        };

        debug!(?mode, "soft device created");

        Ok(Self(Arc::new(SoftDeviceInner {
            timeline,
            next_address: AtomicU64::new(GPU_ADDRESS_BASE),
            worker: Mutex::new(worker),
        })))
    }

    pub fn manual() -> Result<Self> {
        Self::new(ExecutionMode::Manual)
    }

    pub fn threaded(latency: Duration, jitter: Duration) -> Result<Self> {
        Self::new(ExecutionMode::Threaded { latency, jitter })
    }

    pub fn gpu(&self) -> SoftGpu {
        SoftGpu::new(Arc::clone(&self.0.timeline))
    }

    pub fn create_swapchain(&self, buffer_count: usize) -> Result<SoftSwapchain> {
        self.0.timeline.check_ready()?;
        SoftSwapchain::new(Arc::clone(&self.0.timeline), buffer_count)
    }

    pub fn into_device(self) -> Device<SoftBackend> {
        Device::new("soft", self)
    }

    fn reserve_address(&self, byte_size: usize) -> u64 {
        let span = (byte_size as u64).div_ceil(GPU_ADDRESS_GRANULARITY).max(1)
            * GPU_ADDRESS_GRANULARITY;
        self.0.next_address.fetch_add(span, Ordering::Relaxed)
    }
}

impl Drop for SoftDeviceInner {
    fn drop(&mut self) {
        self.timeline.shutdown();

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("soft GPU thread panicked");
            }
        }
    }
}

impl RawDevice<SoftBackend> for SoftDevice {
    fn create_queue(&self) -> Result<SoftQueue> {
        self.0.timeline.check_ready()?;
        Ok(SoftQueue::new(Arc::clone(&self.0.timeline)))
    }

    fn create_fence(&self, initial_value: u64) -> Result<SoftFence> {
        self.0.timeline.check_ready()?;
        let fence = SoftFence::new(initial_value);
        self.0.timeline.register_fence(&fence);
        Ok(fence)
    }

    fn create_event(&self) -> Result<SoftEvent> {
        Ok(SoftEvent::new())
    }

    fn create_command_allocator(&self) -> Result<SoftAllocator> {
        self.0.timeline.check_ready()?;
        Ok(SoftAllocator::new())
    }

    fn create_command_list(&self, allocator: &SoftAllocator) -> Result<SoftCommandList> {
        self.0.timeline.check_ready()?;
        Ok(SoftCommandList::new(allocator))
    }

    fn create_upload_buffer(&self, byte_size: usize) -> Result<SoftBuffer> {
        self.0.timeline.check_ready()?;
        let address = self.reserve_address(byte_size);
        SoftBuffer::new(byte_size, address).ok_or_else(|| {
            Error::device(
                "create_upload_buffer",
                format!("cannot allocate {byte_size} bytes"),
            )
        })
    }
}
