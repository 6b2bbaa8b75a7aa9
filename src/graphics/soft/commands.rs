use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;

use crate::{
    error::{CommandListState, Error, Result},
    graphics::{
        backend::{RawAllocator, RawCommandList},
        types::{GpuBufferHandle, PrimitiveTopology},
    },
};

use super::SoftBackend;

#[derive(Clone, Debug, PartialEq)]
pub enum SoftCommand {
    ClearRenderTarget {
        back_buffer: usize,
        color: [f32; 4],
    },
    SetPipelineState(String),
    SetConstantBufferView {
        slot: u32,
        address: u64,
    },
    SetPrimitiveTopology(PrimitiveTopology),
    SetVertexBuffer(GpuBufferHandle),
    SetIndexBuffer(GpuBufferHandle),
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
}

pub(super) struct AllocatorState {
    /// Lists recorded into this allocator that the GPU has not finished.
    in_flight: AtomicUsize,
    resets: AtomicU64,
}

impl AllocatorState {
    fn submit(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    pub(super) fn retire(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct SoftAllocator(Arc<AllocatorState>);

impl SoftAllocator {
    pub(super) fn new() -> Self {
        Self(Arc::new(AllocatorState {
            in_flight: AtomicUsize::new(0),
            resets: AtomicU64::new(0),
        }))
    }

    pub fn in_flight(&self) -> usize {
        self.0.in_flight.load(Ordering::Acquire)
    }

    pub fn reset_count(&self) -> u64 {
        self.0.resets.load(Ordering::Acquire)
    }
}

impl RawAllocator for SoftAllocator {
    fn reset(&self) -> Result<()> {
        let in_flight = self.in_flight();
        if in_flight > 0 {
            return Err(Error::device(
                "reset_command_allocator",
                format!("{in_flight} command list(s) recorded into this allocator are still executing"),
            ));
        }

        self.0.resets.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

struct ListState {
    allocator: Arc<AllocatorState>,
    commands: Vec<SoftCommand>,
    recording: bool,
}

pub struct SoftCommandList(Mutex<ListState>);

impl SoftCommandList {
    pub(super) fn new(allocator: &SoftAllocator) -> Self {
        Self(Mutex::new(ListState {
            allocator: Arc::clone(&allocator.0),
            commands: Vec::new(),
            recording: true,
        }))
    }

    pub fn record(&self, command: SoftCommand) -> Result<()> {
        let mut state = self.0.lock();

        if !state.recording {
            return Err(Error::CommandListState {
                expected: CommandListState::Recording,
                found: CommandListState::Closed,
            });
        }

        state.commands.push(command);
        Ok(())
    }

    pub fn commands(&self) -> Vec<SoftCommand> {
        self.0.lock().commands.clone()
    }

    /// Snapshot for the GPU timeline. `None` while the list is still open.
    pub(super) fn submit(&self) -> Option<(Vec<SoftCommand>, Arc<AllocatorState>)> {
        let state = self.0.lock();

        if state.recording {
            return None;
        }

        state.allocator.submit();
        Some((state.commands.clone(), Arc::clone(&state.allocator)))
    }
}

impl RawCommandList<SoftBackend> for SoftCommandList {
    fn reset(&self, allocator: &SoftAllocator) -> Result<()> {
        let mut state = self.0.lock();
        state.allocator = Arc::clone(&allocator.0);
        state.commands.clear();
        state.recording = true;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.0.lock().recording = false;
        Ok(())
    }
}
