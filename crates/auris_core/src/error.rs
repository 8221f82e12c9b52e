//! Core pipeline error types.

use thiserror::Error;

/// Errors raised by the device layer, the recorder, the playback pump, and
/// the reconfiguration registry.
///
/// Transient conditions (`Busy`, `Overflow`, `Underflow`) are meant to be
/// logged and resumed by the caller, not propagated as fatal. `OpenFailed`
/// and `ReconfFailed` leave the stage `Stopped` and must be surfaced.
/// `ContractViolation` indicates a caller broke an invariant (e.g. wrong
/// frame length) and is always fatal.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("no audio devices found")]
    NoDevicesFound,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to open device stream: {0}")]
    OpenFailed(String),

    #[error("failed to reconfigure device stream: {0}")]
    ReconfFailed(String),

    #[error("device is busy")]
    Busy,

    #[error("device unsupported configuration: {0}")]
    Unsupported(String),

    #[error("ring buffer overflow - producer outrunning consumer")]
    Overflow,

    #[error("ring buffer underflow - consumer outrunning producer")]
    Underflow,

    #[error("contract violation: expected {expected}, got {got}")]
    ContractViolation { expected: String, got: String },

    #[error("stage is stopped")]
    NotRunning,

    #[error("channel send error - receiver dropped")]
    ChannelSendError,

    #[error("channel receive error - sender dropped")]
    ChannelRecvError,
}

/// Result alias used throughout the core pipeline crate.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Type-erased error used at trait boundaries where a `Source`/`Output`
/// implementation may raise an error from any downstream crate (DSP,
/// codec, network) without this crate depending on those crates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
