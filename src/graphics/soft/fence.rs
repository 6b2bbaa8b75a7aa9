use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{
    error::Result,
    graphics::backend::{RawEvent, RawFence},
};

use super::SoftBackend;

pub(super) struct FenceState {
    completed: AtomicU64,
    waiters: Mutex<Vec<(u64, SoftEvent)>>,
}

impl FenceState {
    /// Advances the completed value. Lower values are ignored; a fence
    /// never goes backwards.
    pub(super) fn complete(&self, value: u64) {
        let mut waiters = self.waiters.lock();

        let completed = self.completed.fetch_max(value, Ordering::AcqRel).max(value);

        waiters.retain(|(target, event)| {
            if *target <= completed {
                event.set();
                false
            } else {
                true
            }
        });
    }
}

#[derive(Clone)]
pub struct SoftFence(Arc<FenceState>);

impl SoftFence {
    pub(super) fn new(initial_value: u64) -> Self {
        Self(Arc::new(FenceState {
            completed: AtomicU64::new(initial_value),
            waiters: Mutex::new(Vec::new()),
        }))
    }

    pub(super) fn state(&self) -> &Arc<FenceState> {
        &self.0
    }

    pub fn pending_events(&self) -> usize {
        self.0.waiters.lock().len()
    }
}

impl RawFence<SoftBackend> for SoftFence {
    fn completed_value(&self) -> u64 {
        self.0.completed.load(Ordering::Acquire)
    }

    fn set_event_on_completion(&self, value: u64, event: &SoftEvent) -> Result<()> {
        let mut waiters = self.0.waiters.lock();

        if self.0.completed.load(Ordering::Acquire) >= value {
            event.set();
        } else {
            waiters.push((value, event.clone()));
        }

        Ok(())
    }
}

/// Auto-reset event, the stand-in for an OS event handle.
#[derive(Clone)]
pub struct SoftEvent(Arc<EventState>);

struct EventState {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl SoftEvent {
    pub(super) fn new() -> Self {
        Self(Arc::new(EventState {
            signaled: Mutex::new(false),
            cond: Condvar::new(),
        }))
    }

    pub(super) fn set(&self) {
        *self.0.signaled.lock() = true;
        self.0.cond.notify_all();
    }
}

impl RawEvent for SoftEvent {
    fn wait(&self, timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut signaled = self.0.signaled.lock();

        while !*signaled {
            match deadline {
                Some(deadline) => {
                    if self.0.cond.wait_until(&mut signaled, deadline).timed_out() {
                        break;
                    }
                }
                None => self.0.cond.wait(&mut signaled),
            }
        }

        let fired = *signaled;
        *signaled = false;
        Ok(fired)
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::{SoftEvent, SoftFence};
    use crate::graphics::backend::{RawEvent, RawFence};

    #[test]
    fn completed_value_never_decreases() {
        let fence = SoftFence::new(0);

        fence.state().complete(5);
        fence.state().complete(3);
        assert_eq!(fence.completed_value(), 5);
    }

    #[test]
    fn event_fires_when_value_reached() {
        let fence = SoftFence::new(0);
        let event = SoftEvent::new();

        fence.set_event_on_completion(2, &event).unwrap();
        fence.state().complete(1);
        assert_eq!(fence.pending_events(), 1);

        let signaler = {
            let fence = fence.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                fence.state().complete(2);
            })
        };

        assert!(event.wait(Some(Duration::from_secs(5))).unwrap());
        signaler.join().unwrap();
        assert_eq!(fence.pending_events(), 0);
    }

    #[test]
    fn event_for_reached_value_fires_immediately() {
        let fence = SoftFence::new(7);
        let event = SoftEvent::new();

        fence.set_event_on_completion(7, &event).unwrap();
        assert!(event.wait(Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn wait_times_out() {
        let event = SoftEvent::new();
        assert!(!event.wait(Some(Duration::from_millis(10))).unwrap());
    }
}
