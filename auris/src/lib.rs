//! auris - wires the voice pipeline crates into ready-to-run pipelines.
//!
//! This crate is the pipeline-assembly layer (C8): it owns no DSP,
//! codec, or device logic of its own, it only composes `auris-core`,
//! `auris-dsp`, `auris-codec`, and `auris-net` into the two directions a
//! voice chat session needs.
//!
//! # Architecture
//!
//! ```text
//! Send:    Recorder --> DspChain --> Encoder --> RtpOutput --> UDP
//! Receive: UDP --> DecodingJitterBuffer --> Player --> Playback device
//! ```

mod pipeline;

pub use auris_core::{
    default_input_device, default_output_device, reconf_all, CaptureDevice, Controllable,
    DeviceError, DeviceParams, Output, PacketSource, PipelineConfig, PlaybackDevice, Player,
    RawSource, Reconfigurable, Recorder, Source, State, FRAME_SIZE, SAMPLE_RATE,
};
pub use auris_codec::{
    CodecError, Decoder, DecodingJitterBuffer, Encoder, EncoderPreset, JitterBuffer, JitterError,
    PacketSink,
};
pub use auris_dsp::{
    DspChain, DspProcessor, GainDsp, NoiseSuppressor, PassthroughDsp, ProcessContext,
    VolumeProcessor,
};
pub use auris_net::{DatagramSink, DatagramSource, NetError, RtpHeader, RtpOutput, RtpReceiver};

pub use pipeline::{PipelineError, ReceivePipeline, SendPipeline};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        assert_eq!(FRAME_SIZE, 960);
        assert_eq!(SAMPLE_RATE, 48_000);
    }
}
