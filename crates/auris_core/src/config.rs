//! Device and pipeline configuration.
//!
//! Sample rate and frame size are not configuration - they are build-time
//! constants (see [`crate::frame`]) - so what is left to configure is
//! channel count, jitter buffer depth, and whether a pipeline starts
//! capturing immediately.

use serde::{Deserialize, Serialize};

/// Per-device parameters validated before a device is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceParams {
    /// 1 = mono, 2 = stereo. Fixed for the lifetime of a pipeline instance.
    pub channels: u16,
}

impl Default for DeviceParams {
    fn default() -> Self {
        Self { channels: 1 }
    }
}

impl DeviceParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 || self.channels > 2 {
            return Err(format!(
                "unsupported channel count: {} (must be 1 or 2)",
                self.channels
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub device: DeviceParams,

    /// Target depth of the jitter/concealment buffer, in packets.
    pub jitter_depth: usize,

    /// Whether the recorder starts capturing as soon as the pipeline is
    /// assembled, rather than waiting for an explicit `start()`.
    pub auto_start: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device: DeviceParams::default(),
            jitter_depth: 4,
            auto_start: false,
        }
    }
}

impl PipelineConfig {
    /// Tuned for low-latency voice chat: mono, shallow jitter buffer.
    pub fn voice() -> Self {
        Self {
            device: DeviceParams { channels: 1 },
            jitter_depth: 3,
            auto_start: false,
        }
    }

    /// Tuned for higher-fidelity stereo playback where a little extra
    /// latency is acceptable in exchange for smoother concealment.
    pub fn music() -> Self {
        Self {
            device: DeviceParams { channels: 2 },
            jitter_depth: 6,
            auto_start: false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.device.validate()?;
        if self.jitter_depth == 0 {
            return Err("jitter_depth must be at least 1".into());
        }
        Ok(())
    }
}
