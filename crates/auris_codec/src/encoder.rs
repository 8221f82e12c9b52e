//! The encoder stage (C4): wraps a `RawSource` and produces Opus packets.

use std::sync::{Mutex, MutexGuard};

use audiopus::coder::Encoder as OpusEncoder;
use audiopus::{Application, Bitrate, Channels, SampleRate};

use auris_core::{BoxError, Controllable, Frame, PacketSource, RawSource, Source, State};

use crate::error::CodecError;

/// Per-preset Opus application, bitrate, and framing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderPreset {
    Voice,
    Music,
}

impl EncoderPreset {
    fn application(self) -> Application {
        match self {
            EncoderPreset::Voice => Application::Voip,
            EncoderPreset::Music => Application::Audio,
        }
    }

    fn bitrate(self) -> Bitrate {
        match self {
            EncoderPreset::Voice => Bitrate::BitsPerSecond(24_576),
            EncoderPreset::Music => Bitrate::BitsPerSecond(98_304),
        }
    }

    /// Maximum encoded packet size this preset ever produces.
    pub fn max_block_size(self) -> usize {
        match self {
            EncoderPreset::Voice => 128,
            EncoderPreset::Music => 1024,
        }
    }

    fn inband_fec(self) -> bool {
        matches!(self, EncoderPreset::Voice)
    }
}

fn opus_channels(count: u16) -> Result<Channels, CodecError> {
    match count {
        1 => Ok(Channels::Mono),
        2 => Ok(Channels::Stereo),
        other => Err(CodecError::ContractViolation {
            expected: 1,
            got: other as usize,
        }),
    }
}

/// Pulls frames from an inner `RawSource` and encodes them with Opus,
/// exposing the result as a `PacketSource`.
///
/// Voice preset forces mono input, which already satisfies the encoder's
/// single-channel operating point without a separate force-channels call -
/// `audiopus`'s safe `Encoder` has no equivalent of `OPUS_SET_FORCE_CHANNELS`,
/// and a mono-only source makes the setting moot anyway.
pub struct Encoder<S> {
    inner: S,
    preset: EncoderPreset,
    encoder: Mutex<OpusEncoder>,
    scratch: Mutex<Frame>,
}

impl<S: RawSource> Encoder<S> {
    pub fn new(inner: S, preset: EncoderPreset) -> Result<Self, CodecError> {
        let channels = opus_channels(inner.channels())?;
        let mut encoder = OpusEncoder::new(SampleRate::Hz48000, channels, preset.application())?;
        encoder.set_bitrate(preset.bitrate())?;
        if preset.inband_fec() {
            encoder.set_inband_fec(true)?;
        }

        Ok(Self {
            inner,
            preset,
            encoder: Mutex::new(encoder),
            scratch: Mutex::new(Vec::new()),
        })
    }

    pub fn preset(&self) -> EncoderPreset {
        self.preset
    }

    pub fn set_packet_loss_percent(&self, percent: u8) -> Result<(), CodecError> {
        self.encoder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set_packet_loss_percent(percent)?;
        Ok(())
    }
}

impl<S: RawSource> Controllable for Encoder<S> {
    fn start(&self) -> Result<(), BoxError> {
        self.inner.start()
    }
    fn stop(&self) -> Result<(), BoxError> {
        self.inner.stop()
    }
    fn state(&self) -> State {
        self.inner.state()
    }
}

impl<S: RawSource> Source for Encoder<S> {
    fn channels(&self) -> u16 {
        self.inner.channels()
    }
    fn wait_active(&self) {
        self.inner.wait_active()
    }
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner.lock_state()
    }
}

impl<S: RawSource> PacketSource for Encoder<S> {
    fn read_packet(&self) -> Result<Vec<u8>, BoxError> {
        let mut scratch = self.scratch.lock().unwrap_or_else(|e| e.into_inner());
        self.inner.read(&mut scratch)?;

        let max = self.preset.max_block_size();
        let mut out = vec![0u8; max];
        let n = self
            .encoder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .encode_float(&scratch, &mut out)
            .map_err(CodecError::from)?;
        out.truncate(n);
        Ok(out)
    }
}
