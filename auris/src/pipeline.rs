//! Pipeline assembly (C8): `SendPipeline` wires a `Recorder` through a DSP
//! chain into an `RtpOutput`; `ReceivePipeline` wires an `RtpReceiver`
//! through a `DecodingJitterBuffer` into the default output device. Each
//! owns a dedicated pump thread (plus, for receive, a network thread) for
//! its entire lifetime.

use std::sync::Arc;

use thiserror::Error;

use auris_codec::{DecodingJitterBuffer, EncoderPreset};
use auris_core::{
    default_output_device, Controllable, PipelineConfig, PlaybackDevice, Player, Recorder,
};
use auris_dsp::{DspChain, NoiseSuppressor, VolumeProcessor};
use auris_net::{DatagramSink, DatagramSource, NetError, RtpOutput, RtpReceiver};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline configuration invalid: {0}")]
    Config(String),

    #[error("failed to assemble pipeline: {0}")]
    Assembly(String),

    #[error(transparent)]
    Net(#[from] NetError),
}

/// Capture device → noise suppression → volume → Opus encode → RTP
/// framing → a caller-supplied [`DatagramSink`]. Owns a pump thread for
/// its entire lifetime; dropping a `SendPipeline` stops that thread after
/// at most one in-flight frame.
pub struct SendPipeline {
    recorder: Arc<Recorder>,
    pump: Player,
}

impl SendPipeline {
    pub fn new<D: DatagramSink + 'static>(
        config: PipelineConfig,
        preset: EncoderPreset,
        sink: D,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;

        let channels = config.device.channels;
        let mut dsp = DspChain::new(channels as usize);
        let suppressor = NoiseSuppressor::new(channels as usize)
            .map_err(|e| PipelineError::Assembly(e.to_string()))?;
        dsp.add(suppressor);
        dsp.add(VolumeProcessor::new());

        let recorder =
            Recorder::new(channels, dsp).map_err(|e| PipelineError::Assembly(e.to_string()))?;
        let output = RtpOutput::new(sink, preset, channels)?;

        if config.auto_start {
            recorder
                .start()
                .map_err(|e| PipelineError::Assembly(e.to_string()))?;
        }

        let pump_source = Arc::clone(&recorder);
        let pump = Player::new(pump_source, output, || {
            tracing::info!("send pipeline's recorder finalized, pump exiting");
        });

        Ok(Self { recorder, pump })
    }

    /// The underlying recorder, for direct `start`/`stop`/`reconf` control.
    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    /// Applies multiplicatively to every frame before it's encoded. 1.0 is
    /// unity; use to mute or duck the outgoing stream without touching
    /// the recorder's own DSP chain.
    pub fn set_send_gain(&self, gain: f32) {
        self.pump.set_volume(gain);
    }
}

/// [`RtpReceiver`] → [`DecodingJitterBuffer`] → [`Player`] → the default
/// output device. Owns the receive thread and the pump thread for its
/// entire lifetime; dropping a `ReceivePipeline` stops both, the receiver
/// first since its field is declared before the pump's and Rust drops
/// struct fields in declaration order - so the pump never outlives the
/// thing feeding its jitter buffer.
pub struct ReceivePipeline {
    jitter: Arc<DecodingJitterBuffer>,
    receiver: RtpReceiver,
    pump: Player,
}

impl ReceivePipeline {
    pub fn new<D: DatagramSource + 'static>(
        config: PipelineConfig,
        preset: EncoderPreset,
        source: D,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;

        let channels = config.device.channels;
        let cpal_device =
            default_output_device().map_err(|e| PipelineError::Assembly(e.to_string()))?;
        let output = PlaybackDevice::open(&cpal_device, channels)
            .map_err(|e| PipelineError::Assembly(e.to_string()))?;

        let jitter = Arc::new(
            DecodingJitterBuffer::new(config.jitter_depth, preset, channels)
                .map_err(|e| PipelineError::Assembly(e.to_string()))?,
        );
        jitter
            .start()
            .map_err(|e| PipelineError::Assembly(e.to_string()))?;

        let receiver = RtpReceiver::spawn(source, Arc::clone(&jitter), preset.max_block_size());

        let pump_source = Arc::clone(&jitter);
        let pump = Player::new(pump_source, output, || {
            tracing::info!("receive pipeline's jitter buffer finalized, pump exiting");
        });

        Ok(Self {
            jitter,
            receiver,
            pump,
        })
    }

    /// The underlying jitter buffer, for direct `start`/`stop` control.
    pub fn jitter(&self) -> &Arc<DecodingJitterBuffer> {
        &self.jitter
    }

    /// Applies multiplicatively to every frame as it's played back. 1.0 is
    /// unity.
    pub fn set_playback_gain(&self, gain: f32) {
        self.pump.set_volume(gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct NullSink {
        sent: Mutex<usize>,
    }

    impl DatagramSink for NullSink {
        fn send(&self, bytes: &[u8]) -> std::io::Result<usize> {
            *self.sent.lock().unwrap() += 1;
            Ok(bytes.len())
        }
    }

    #[test]
    fn rejects_invalid_config_before_touching_any_device() {
        let mut config = PipelineConfig::voice();
        config.device.channels = 0;
        let sink = NullSink {
            sent: Mutex::new(0),
        };
        let err = SendPipeline::new(config, EncoderPreset::Voice, sink).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    struct NullSource;

    impl DatagramSource for NullSource {
        fn recv(&self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "no data"))
        }
    }

    #[test]
    fn receive_pipeline_rejects_invalid_config_before_opening_any_device() {
        let mut config = PipelineConfig::voice();
        config.device.channels = 0;
        let err = ReceivePipeline::new(config, EncoderPreset::Voice, NullSource).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
