//! The decoder stage (C4): wraps a `PacketSource` and implements the
//! raw-source contract, exploiting Opus in-band FEC via a one-packet
//! lookahead.

use std::sync::{Mutex, MutexGuard};

use audiopus::coder::Decoder as OpusDecoder;
use audiopus::SampleRate;

use auris_core::{BoxError, Controllable, Frame, PacketSource, RawSource, Source, State, FRAME_SIZE};

use crate::encoder::EncoderPreset;
use crate::error::CodecError;

fn opus_channels(count: u16) -> Result<audiopus::Channels, CodecError> {
    match count {
        1 => Ok(audiopus::Channels::Mono),
        2 => Ok(audiopus::Channels::Stereo),
        other => Err(CodecError::ContractViolation {
            expected: 1,
            got: other as usize,
        }),
    }
}

/// Whether the decoder is currently sitting on an undecoded packet,
/// waiting to see if the packet after it carries FEC redundancy for it.
enum Lookahead {
    Empty,
    Holding(Vec<u8>),
}

struct DecoderState {
    decoder: OpusDecoder,
    lookahead: Lookahead,
}

pub struct Decoder<S> {
    inner: S,
    channels: u16,
    state: Mutex<DecoderState>,
}

impl<S: PacketSource> Decoder<S> {
    pub fn new(inner: S) -> Result<Self, CodecError> {
        let channels = inner.channels();
        let decoder = OpusDecoder::new(SampleRate::Hz48000, opus_channels(channels)?)?;
        Ok(Self {
            inner,
            channels,
            state: Mutex::new(DecoderState {
                decoder,
                lookahead: Lookahead::Empty,
            }),
        })
    }

    fn frame_len(&self) -> usize {
        FRAME_SIZE * self.channels as usize
    }

    fn decode_normal(decoder: &mut OpusDecoder, packet: &[u8], out: &mut Frame) -> Result<(), CodecError> {
        let n = decoder.decode_float(Some(packet), out, false)?;
        if n != out.len() {
            return Err(CodecError::ContractViolation {
                expected: out.len(),
                got: n,
            });
        }
        Ok(())
    }

    fn decode_fec(decoder: &mut OpusDecoder, next_packet: &[u8], out: &mut Frame) -> Result<(), CodecError> {
        let n = decoder.decode_float(Some(next_packet), out, true)?;
        if n != out.len() {
            return Err(CodecError::ContractViolation {
                expected: out.len(),
                got: n,
            });
        }
        Ok(())
    }

    fn decode_plc(decoder: &mut OpusDecoder, out: &mut Frame) -> Result<(), CodecError> {
        let n = decoder.decode_float(None, out, false)?;
        if n != out.len() {
            return Err(CodecError::ContractViolation {
                expected: out.len(),
                got: n,
            });
        }
        Ok(())
    }
}

impl<S: PacketSource> Controllable for Decoder<S> {
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

impl<S: PacketSource> Source for Decoder<S> {
    fn channels(&self) -> u16 {
        self.channels
    }
    fn wait_active(&self) {
        self.inner.wait_active()
    }
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner.lock_state()
    }
}

impl<S: PacketSource> RawSource for Decoder<S> {
    fn read(&self, frame: &mut Frame) -> Result<(), BoxError> {
        let frame_len = self.frame_len();
        frame.resize(frame_len, 0.0);

        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let DecoderState { decoder, lookahead } = &mut *guard;

        let held = std::mem::replace(lookahead, Lookahead::Empty);
        match held {
            Lookahead::Empty => {
                let primary = self.inner.read_packet()?;
                if !primary.is_empty() {
                    Self::decode_normal(decoder, &primary, frame).map_err(CodecError::from)?;
                } else {
                    // Primary lost: peek one packet ahead for in-band FEC.
                    let next = self.inner.read_packet()?;
                    if next.is_empty() {
                        Self::decode_plc(decoder, frame).map_err(CodecError::from)?;
                        *lookahead = Lookahead::Holding(Vec::new());
                    } else {
                        Self::decode_fec(decoder, &next, frame).map_err(CodecError::from)?;
                        // `next`'s own content still needs decoding as its
                        // own frame once we confirm the packet after it.
                        *lookahead = Lookahead::Holding(next);
                    }
                }
            }
            Lookahead::Holding(held_packet) => {
                // Only used to decide whether the held packet can now be
                // decoded normally; its bytes are not retained per the
                // one-packet lookahead contract.
                let l_prime = self.inner.read_packet()?;
                if l_prime.is_empty() {
                    Self::decode_plc(decoder, frame).map_err(CodecError::from)?;
                    *lookahead = Lookahead::Holding(held_packet);
                } else if held_packet.is_empty() {
                    // Nothing concrete was ever held (the lookahead that
                    // triggered this hold was itself a loss); synthesize
                    // rather than hand the decoder an empty slice.
                    Self::decode_plc(decoder, frame).map_err(CodecError::from)?;
                    *lookahead = Lookahead::Empty;
                } else {
                    Self::decode_normal(decoder, &held_packet, frame).map_err(CodecError::from)?;
                    *lookahead = Lookahead::Empty;
                }
            }
        }

        Ok(())
    }
}

/// Convenience constructor matching the preset a peer encoder was built
/// with, so decoder construction reads the same way encoder construction
/// does at call sites.
pub fn decoder_for_preset<S: PacketSource>(inner: S, _preset: EncoderPreset) -> Result<Decoder<S>, CodecError> {
    Decoder::new(inner)
}
