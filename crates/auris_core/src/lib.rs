//! auris-core - device layer, recorder, playback pump, and the shared
//! `Source`/`Output` contracts the rest of the voice pipeline is built on.
//!
//! # Architecture
//!
//! ```text
//! Capture device ──▶ Recorder (+ DSP chain) ──▶ encoder (auris-codec)
//!                                                     │
//!                                                     ▼
//!                                              network / jitter buffer
//!                                                     │
//!                                                     ▼
//! Playback device ◀── Player pump ◀── decoder (auris-codec)
//! ```
//!
//! Sample rate and frame size are frozen build-time constants (see
//! [`frame`]), not runtime configuration. The reconfiguration registry
//! (`registry`) is what lets a recorder or playback device rebuild itself
//! against a new OS default device without the rest of the pipeline
//! knowing anything happened.

mod config;
mod device;
mod error;
mod frame;
mod player;
mod recorder;
mod registry;
mod state;
#[doc(hidden)]
pub mod test_support;
mod traits;

pub use config::{DeviceParams, PipelineConfig};
pub use device::{default_input_device, default_output_device, CaptureDevice, PlaybackDevice};
pub use error::{BoxError, DeviceError, DeviceResult};
pub use frame::{Frame, State, FRAME_SIZE, SAMPLE_RATE};
pub use player::Player;
pub use recorder::Recorder;
pub use registry::{reconf_all, RegistryHandle};
pub use state::StateCell;
pub use traits::{Controllable, Output, PacketSource, RawSource, Reconfigurable, Source};
