use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use atomig::{Atom, Atomic};
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use tracing::{trace, warn};

use crate::{
    error::{CommandListState, Error, Result},
    graphics::backend::RawQueue,
};

use super::{
    commands::{AllocatorState, SoftCommand, SoftCommandList},
    fence::{FenceState, SoftFence},
    SoftBackend,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceStatus {
    Ready = 0,
    Removed = 1,
}

impl Atom for DeviceStatus {
    type Repr = u8;

    fn pack(self) -> Self::Repr {
        self as u8
    }

    fn unpack(src: Self::Repr) -> Self {
        match src {
            0 => DeviceStatus::Ready,
            _ => DeviceStatus::Removed,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExecutionLog {
    pub lists: u64,
    pub draws: u64,
    pub signals: u64,
    pub last_signaled: u64,
    /// Commands of the most recently executed list.
    pub last_list: Vec<SoftCommand>,
}

enum GpuOp {
    Execute {
        commands: Vec<SoftCommand>,
        allocator: Arc<AllocatorState>,
    },
    Signal {
        fence: Arc<FenceState>,
        value: u64,
    },
}

pub(super) struct Timeline {
    ops: Mutex<VecDeque<GpuOp>>,
    work_available: Condvar,
    shutdown: AtomicBool,
    status: Atomic<DeviceStatus>,
    fences: Mutex<Vec<Weak<FenceState>>>,
    log: Mutex<ExecutionLog>,
}

impl Timeline {
    pub(super) fn new() -> Self {
        Self {
            ops: Mutex::new(VecDeque::new()),
            work_available: Condvar::new(),
            shutdown: AtomicBool::new(false),
            status: Atomic::new(DeviceStatus::Ready),
            fences: Mutex::new(Vec::new()),
            log: Mutex::new(ExecutionLog::default()),
        }
    }

    pub(super) fn check_ready(&self) -> Result<()> {
        match self.status.load(Ordering::Acquire) {
            DeviceStatus::Ready => Ok(()),
            DeviceStatus::Removed => Err(Error::DeviceRemoved),
        }
    }

    pub(super) fn register_fence(&self, fence: &SoftFence) {
        let mut fences = self.fences.lock();
        fences.retain(|fence| fence.strong_count() > 0);
        fences.push(Arc::downgrade(fence.state()));
    }

    fn push(&self, op: GpuOp) {
        self.ops.lock().push_back(op);
        self.work_available.notify_one();
    }

    // Returns `false` when idle.
    fn step(&self, latency: Duration) -> bool {
        let Some(op) = self.ops.lock().pop_front() else {
            return false;
        };

        self.process(op, latency);
        true
    }

    fn process(&self, op: GpuOp, latency: Duration) {
        match op {
            GpuOp::Execute {
                commands,
                allocator,
            } => {
                if !latency.is_zero() {
                    std::thread::sleep(latency);
                }

                let draws = commands
                    .iter()
                    .filter(|command| matches!(command, SoftCommand::DrawIndexed { .. }))
                    .count() as u64;

                {
                    let mut log = self.log.lock();
                    log.lists += 1;
                    log.draws += draws;
                    log.last_list = commands;
                }

                allocator.retire();
            }
            GpuOp::Signal { fence, value } => {
                fence.complete(value);

                let mut log = self.log.lock();
                log.signals += 1;
                log.last_signaled = log.last_signaled.max(value);
                trace!(value, "soft GPU reached fence value");
            }
        }
    }

    pub(super) fn run(&self, latency: Duration, jitter: Duration) {
        let mut rng = rand::thread_rng();

        loop {
            let op = {
                let mut ops = self.ops.lock();
                loop {
                    if self.shutdown.load(Ordering::Acquire) {
                        return;
                    }

                    if let Some(op) = ops.pop_front() {
                        break op;
                    }

                    self.work_available.wait(&mut ops);
                }
            };

            let extra = if jitter.is_zero() {
                Duration::ZERO
            } else {
                Duration::from_micros(rng.gen_range(0..=jitter.as_micros() as u64))
            };

            self.process(op, latency + extra);
        }
    }

    pub(super) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _guard = self.ops.lock();
        self.work_available.notify_all();
    }

    fn remove_device(&self) {
        warn!("soft device removed");
        self.status.store(DeviceStatus::Removed, Ordering::Release);

        // A removed device reports every fence as complete, so no CPU wait
        // hangs on work that will never run.
        for op in self.ops.lock().drain(..) {
            if let GpuOp::Execute { allocator, .. } = op {
                allocator.retire();
            }
        }
        for fence in self.fences.lock().iter().filter_map(Weak::upgrade) {
            fence.complete(u64::MAX);
        }
    }
}

#[derive(Clone)]
pub struct SoftQueue {
    timeline: Arc<Timeline>,
    fail_next_signal: Arc<AtomicBool>,
}

impl SoftQueue {
    pub(super) fn new(timeline: Arc<Timeline>) -> Self {
        Self {
            timeline,
            fail_next_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the next `signal` fail without enqueueing anything.
    pub fn fail_next_signal(&self) {
        self.fail_next_signal.store(true, Ordering::Release);
    }
}

impl RawQueue<SoftBackend> for SoftQueue {
    fn execute(&self, list: &SoftCommandList) -> Result<()> {
        self.timeline.check_ready()?;

        let (commands, allocator) = list.submit().ok_or(Error::CommandListState {
            expected: CommandListState::Closed,
            found: CommandListState::Recording,
        })?;

        self.timeline.push(GpuOp::Execute {
            commands,
            allocator,
        });
        Ok(())
    }

    fn signal(&self, fence: &SoftFence, value: u64) -> Result<()> {
        self.timeline.check_ready()?;

        if self.fail_next_signal.swap(false, Ordering::AcqRel) {
            return Err(Error::device("signal", "queue rejected the fence signal"));
        }

        self.timeline.push(GpuOp::Signal {
            fence: Arc::clone(fence.state()),
            value,
        });
        Ok(())
    }
}

#[derive(Clone)]
pub struct SoftGpu {
    timeline: Arc<Timeline>,
}

impl SoftGpu {
    pub(super) fn new(timeline: Arc<Timeline>) -> Self {
        Self { timeline }
    }

    /// Executes one queued operation. Only meaningful in manual mode.
    pub fn step(&self) -> bool {
        self.timeline.step(Duration::ZERO)
    }

    /// Executes queued operations until the next fence signal has been
    /// processed. Returns the signaled value, or `None` if the queue ran dry.
    pub fn step_to_next_signal(&self) -> Option<u64> {
        loop {
            let op = self.timeline.ops.lock().pop_front()?;
            let signaled = match &op {
                GpuOp::Signal { value, .. } => Some(*value),
                GpuOp::Execute { .. } => None,
            };

            self.timeline.process(op, Duration::ZERO);

            if signaled.is_some() {
                return signaled;
            }
        }
    }

    pub fn run_until_idle(&self) -> usize {
        let mut steps = 0;
        while self.step() {
            steps += 1;
        }
        steps
    }

    pub fn pending(&self) -> usize {
        self.timeline.ops.lock().len()
    }

    pub fn log(&self) -> ExecutionLog {
        self.timeline.log.lock().clone()
    }

    pub fn status(&self) -> DeviceStatus {
        self.timeline.status.load(Ordering::Acquire)
    }

    pub fn remove_device(&self) {
        self.timeline.remove_device();
    }
}
