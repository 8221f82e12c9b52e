//! DSP chain for the voice pipeline: noise suppression and volume,
//! applied in a fixed order over every frame.
//!
//! # Architecture
//!
//! ```text
//! Recorder --> [NoiseSuppressor] --> [Volume] --> downstream
//! ```
//!
//! Follows the "no allocation in the audio callback" rule: processors
//! pre-allocate any scratch buffers at construction; `process()` never
//! allocates.

mod error;
mod noise;
mod processor;
mod volume;

pub use error::DspError;
pub use noise::NoiseSuppressor;
pub use processor::{DspChain, DspProcessor, GainDsp, PassthroughDsp, ProcessContext};
pub use volume::VolumeProcessor;
