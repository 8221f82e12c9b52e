//! Noise suppressor built on `nnnoiseless`, a pure-Rust RNNoise port.
//!
//! `nnnoiseless` operates on its own native frame size (480 samples) and
//! expects samples scaled to the `i16` range rather than unit-amplitude
//! floats. This processor owns that rescaling and chunking so the rest
//! of the chain never has to know about either detail.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use nnnoiseless::DenoiseState;

use crate::error::DspError;
use crate::processor::{DspProcessor, ProcessContext};

/// Samples per channel `nnnoiseless` processes per call.
const NATIVE_FRAME: usize = DenoiseState::FRAME_SIZE;

const I16_SCALE: f32 = i16::MAX as f32;

pub struct NoiseSuppressor {
    state: Box<DenoiseState<'static>>,
    enabled: AtomicBool,
    scratch_in: Vec<f32>,
    scratch_out: Vec<f32>,
}

impl NoiseSuppressor {
    /// `channels` is validated but otherwise unused: `process`/`process_chunk`
    /// chunk the buffer directly without de-interleaving, so this only
    /// produces correct output for mono input. Multi-channel frames would
    /// need de-interleaving added before this suppressor could run on them;
    /// today's pipeline only ever feeds it mono, so that hasn't been built.
    pub fn new(channels: usize) -> Result<Self, DspError> {
        if channels == 0 {
            return Err(DspError::InvalidChannelCount(channels));
        }
        Ok(Self {
            state: DenoiseState::new(),
            enabled: AtomicBool::new(true),
            scratch_in: vec![0.0; NATIVE_FRAME],
            scratch_out: vec![0.0; NATIVE_FRAME],
        })
    }

    /// Like [`Self::new`], but first tries to load a custom model from
    /// `model_path`. `nnnoiseless`'s public surface has no way to build a
    /// `DenoiseState` from arbitrary model bytes, so a readable file here
    /// still runs the built-in model - the same way an unreadable one
    /// does - with a warning explaining why, rather than silently
    /// pretending the custom model took effect.
    pub fn with_model_path(channels: usize, model_path: &Path) -> Result<Self, DspError> {
        match std::fs::read(model_path) {
            Ok(_) => {
                tracing::warn!(
                    path = %model_path.display(),
                    "custom rnnoise models are not supported by this build; using the built-in model"
                );
            }
            Err(e) => {
                tracing::warn!(
                    path = %model_path.display(),
                    error = %e,
                    "could not open custom rnnoise model; falling back to the built-in model"
                );
            }
        }
        Self::new(channels)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled_flag(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Runs one native-sized chunk through the denoiser, scaling in and
    /// back out of the `i16` range `nnnoiseless` expects.
    fn process_chunk(&mut self, chunk: &mut [f32]) {
        for (dst, src) in self.scratch_in.iter_mut().zip(chunk.iter()) {
            *dst = *src * I16_SCALE;
        }
        self.state
            .process_frame(&mut self.scratch_out, &self.scratch_in);
        for (dst, src) in chunk.iter_mut().zip(self.scratch_out.iter()) {
            *dst = *src / I16_SCALE;
        }
    }
}

impl DspProcessor for NoiseSuppressor {
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        if buffer.len() % NATIVE_FRAME != 0 {
            tracing::error!(
                len = buffer.len(),
                native_frame = NATIVE_FRAME,
                "buffer length is not a multiple of the noise suppressor's native frame"
            );
            return;
        }
        let _ = context; // chunking is independent of channel count: mono assumed per-chunk
        for chunk in buffer.chunks_mut(NATIVE_FRAME) {
            self.process_chunk(chunk);
        }
    }

    fn reset(&mut self) {
        self.state = DenoiseState::new();
    }

    fn name(&self) -> &'static str {
        "NoiseSuppressor"
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}
