//! RTP framing for the voice pipeline's network send path.
//!
//! `RtpOutput` owns its own Opus encoder (mirroring
//! `original_source/src/audio/rtp.hpp`'s `RtpOutput`, which owns an
//! `OpusEnc` directly rather than pulling from a separately-owned
//! `PacketSource`) and implements `auris_core::Output`: every frame handed
//! to `write` is encoded, prefixed with a 12-byte RTP header, and handed to
//! a caller-supplied [`DatagramSink`].

use std::io::Write as _;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use audiopus::coder::Encoder as OpusEncoder;
use audiopus::SampleRate;

use auris_codec::{EncoderPreset, JitterBuffer, PacketSink};
use auris_core::{BoxError, Frame, Output, FRAME_SIZE};

use crate::error::NetError;

const RTP_HEADER_LEN: usize = 12;
/// `V=2, P=0, X=0, CC=0, M=0, PT=0`, network byte order.
const RTP_FLAGS: u16 = 0x8000;

/// The 12-byte RTP fixed header (RFC 3550 §5.1), with CSRC list elided
/// since `CC=0` always here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub flags: u16,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    pub fn to_bytes(self) -> [u8; RTP_HEADER_LEN] {
        let mut buf = Vec::with_capacity(RTP_HEADER_LEN);
        buf.write_u16::<BigEndian>(self.flags).unwrap();
        buf.write_u16::<BigEndian>(self.sequence).unwrap();
        buf.write_u32::<BigEndian>(self.timestamp).unwrap();
        buf.write_u32::<BigEndian>(self.ssrc).unwrap();
        buf.try_into().unwrap()
    }

    /// Splits an incoming datagram into its header and payload. A datagram
    /// shorter than the fixed header is malformed, not merely a lost
    /// packet, and is rejected rather than treated as silence.
    pub fn parse(datagram: &[u8]) -> Result<(Self, &[u8]), NetError> {
        if datagram.len() < RTP_HEADER_LEN {
            return Err(NetError::Truncated {
                min: RTP_HEADER_LEN,
                got: datagram.len(),
            });
        }
        let mut cursor = &datagram[..RTP_HEADER_LEN];
        let header = RtpHeader {
            flags: cursor.read_u16::<BigEndian>().unwrap(),
            sequence: cursor.read_u16::<BigEndian>().unwrap(),
            timestamp: cursor.read_u32::<BigEndian>().unwrap(),
            ssrc: cursor.read_u32::<BigEndian>().unwrap(),
        };
        Ok((header, &datagram[RTP_HEADER_LEN..]))
    }
}

/// A destination for framed RTP datagrams. Implemented for
/// `std::net::UdpSocket` (assumed already `connect`-ed to the peer); the
/// socket's lifecycle and addressing are entirely the caller's concern.
pub trait DatagramSink: Send + Sync {
    fn send(&self, bytes: &[u8]) -> std::io::Result<usize>;
}

impl DatagramSink for std::net::UdpSocket {
    fn send(&self, bytes: &[u8]) -> std::io::Result<usize> {
        std::net::UdpSocket::send(self, bytes)
    }
}

/// A source of inbound RTP datagrams. Implemented for `std::net::UdpSocket`
/// the same way `DatagramSink` is; the caller owns binding and connecting.
pub trait DatagramSource: Send + Sync {
    fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl DatagramSource for std::net::UdpSocket {
    fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::net::UdpSocket::recv(self, buf)
    }
}

/// The network receive task (§5): a dedicated thread that pulls datagrams
/// from a [`DatagramSource`], strips the RTP header, and pushes the Opus
/// payload into any [`PacketSink`] - a raw [`JitterBuffer`] or a
/// `DecodingJitterBuffer`, whichever the caller wired up. A datagram with
/// an empty payload, or one too short to carry a header at all, is
/// treated as a lost packet - pushed as an empty `Vec`, which the
/// decoder's FEC/PLC lookahead already knows how to handle - rather than
/// surfaced as an error to the caller.
///
/// Dropping a receiver joins its thread, which only checks for the stop
/// request between calls to `recv`; a source with no read timeout set can
/// make that join block indefinitely. Give the underlying socket a read
/// timeout (`UdpSocket::set_read_timeout`) if prompt shutdown matters.
pub struct RtpReceiver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RtpReceiver {
    pub fn spawn<D: DatagramSource + 'static, J: PacketSink + 'static>(
        source: D,
        jitter: Arc<J>,
        max_datagram: usize,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("auris-rtp-recv".into())
            .spawn(move || {
                let mut datagram = vec![0u8; RTP_HEADER_LEN + max_datagram];
                while !thread_stop.load(Ordering::Relaxed) {
                    let n = match source.recv(&mut datagram) {
                        Ok(n) => n,
                        Err(e) => {
                            tracing::warn!(error = %e, "rtp receiver: transient recv error, continuing");
                            continue;
                        }
                    };

                    let payload = match RtpHeader::parse(&datagram[..n]) {
                        Ok((_, payload)) => payload.to_vec(),
                        Err(e) => {
                            tracing::warn!(error = %e, "rtp receiver: malformed datagram treated as loss");
                            Vec::new()
                        }
                    };

                    if let Err(e) = jitter.push(payload) {
                        tracing::warn!(error = %e, "rtp receiver: packet rejected by jitter buffer");
                    }
                }
            })
            .expect("failed to spawn rtp receiver thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for RtpReceiver {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub struct RtpOutput<D: DatagramSink> {
    sink: D,
    encoder: Mutex<OpusEncoder>,
    max_packet: usize,
    sequence: AtomicU16,
    scratch: Mutex<Vec<u8>>,
}

fn opus_channels(count: u16) -> Result<audiopus::Channels, NetError> {
    match count {
        1 => Ok(audiopus::Channels::Mono),
        2 => Ok(audiopus::Channels::Stereo),
        other => Err(NetError::Codec(auris_codec::CodecError::ContractViolation {
            expected: 1,
            got: other as usize,
        })),
    }
}

impl<D: DatagramSink> RtpOutput<D> {
    pub fn new(sink: D, preset: EncoderPreset, channels: u16) -> Result<Self, NetError> {
        let application = match preset {
            EncoderPreset::Voice => audiopus::Application::Voip,
            EncoderPreset::Music => audiopus::Application::Audio,
        };
        let bitrate = match preset {
            EncoderPreset::Voice => audiopus::Bitrate::BitsPerSecond(24_576),
            EncoderPreset::Music => audiopus::Bitrate::BitsPerSecond(98_304),
        };
        let mut encoder = OpusEncoder::new(SampleRate::Hz48000, opus_channels(channels)?, application)
            .map_err(auris_codec::CodecError::from)?;
        encoder
            .set_bitrate(bitrate)
            .map_err(auris_codec::CodecError::from)?;
        if matches!(preset, EncoderPreset::Voice) {
            encoder
                .set_inband_fec(true)
                .map_err(auris_codec::CodecError::from)?;
        }

        Ok(Self {
            sink,
            encoder: Mutex::new(encoder),
            max_packet: preset.max_block_size(),
            sequence: AtomicU16::new(0),
            scratch: Mutex::new(vec![0u8; RTP_HEADER_LEN + preset.max_block_size()]),
        })
    }
}

impl<D: DatagramSink> Output for RtpOutput<D> {
    fn write(&self, frame: &Frame) -> Result<(), BoxError> {
        if frame.is_empty() {
            return Ok(());
        }

        let mut encoded = vec![0u8; self.max_packet];
        let n = self
            .encoder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .encode_float(frame, &mut encoded)
            .map_err(auris_codec::CodecError::from)
            .map_err(NetError::from)?;
        encoded.truncate(n);

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let header = RtpHeader {
            flags: RTP_FLAGS,
            sequence,
            timestamp: (sequence as u32).wrapping_mul(FRAME_SIZE as u32),
            ssrc: 0,
        };

        let mut datagram = self.scratch.lock().unwrap_or_else(|e| e.into_inner());
        datagram.clear();
        datagram.write_all(&header.to_bytes()).unwrap();
        datagram.write_all(&encoded).unwrap();

        let sent = self
            .sink
            .send(&datagram)
            .map_err(NetError::from)?;
        if sent != datagram.len() {
            return Err(Box::new(NetError::ShortSend {
                sent,
                total: datagram.len(),
            }));
        }
        Ok(())
    }
}
