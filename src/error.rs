use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the frame synchronization core.
///
/// Device and fence failures are not retryable: once one is returned the
/// device should be considered unusable and the render loop torn down.
#[derive(Error, Debug)]
pub enum Error {
    #[error("device call `{op}` failed: {message}")]
    Device { op: &'static str, message: String },

    #[error("graphics device was removed")]
    DeviceRemoved,

    #[error("waiting for fence value {value} failed: {message}")]
    FenceWait { value: u64, message: String },

    #[error("fence value {value} not reached within {timeout:?} (completed: {completed})")]
    FenceTimeout {
        value: u64,
        completed: u64,
        timeout: Duration,
    },

    #[error("a submitted frame was never signaled; flush the queue before rendering again")]
    UnsignaledSubmission,

    #[error("command list is {found:?}, expected {expected:?}")]
    CommandListState {
        expected: CommandListState,
        found: CommandListState,
    },

    #[error("{kind} capacity of {capacity} exceeded")]
    CapacityExceeded { kind: &'static str, capacity: usize },

    #[error("geometry `{geometry}` has no submesh `{submesh}`")]
    UnknownSubmesh { geometry: String, submesh: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn device(op: &'static str, message: impl Into<String>) -> Self {
        Error::Device {
            op,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandListState {
    Recording,
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
