//! auris-codec - Opus encode/decode stages and the jitter buffer that sits
//! between a network receive path and a decoder.
//!
//! # Architecture
//!
//! ```text
//! RawSource (recorder) ──▶ Encoder ──▶ PacketSource ──▶ network
//!
//! network ──▶ JitterBuffer / DecodingJitterBuffer ──▶ Decoder ──▶ RawSource (pump)
//! ```
//!
//! `Encoder<S>` and `Decoder<S>` are thin wrappers: each delegates its
//! control surface (`start`/`stop`/`state`/`channels`/`wait_active`) to the
//! stage it wraps and implements only the data transform, so any
//! `RawSource` can be encoded and any `PacketSource` can be decoded without
//! either side knowing about the other.

mod decoder;
mod encoder;
mod error;
mod jitter;

pub use decoder::{decoder_for_preset, Decoder};
pub use encoder::{Encoder, EncoderPreset};
pub use error::{CodecError, CodecResult, JitterError};
pub use jitter::{DecodingJitterBuffer, JitterBuffer, PacketSink};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        assert_eq!(EncoderPreset::Voice.max_block_size(), 128);
        let buf = JitterBuffer::new(3, EncoderPreset::Music);
        assert_eq!(buf.capacity(), 9);
    }
}
