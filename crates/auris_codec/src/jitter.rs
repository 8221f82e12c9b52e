//! The jitter/concealment buffer (C5): a bounded FIFO of packets between
//! the network receive path and a decoder, with a catch-up policy that
//! drains excess latency after a network burst.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

use audiopus::coder::Decoder as OpusDecoder;
use audiopus::SampleRate;

use auris_core::{BoxError, Controllable, Frame, RawSource, Source, State, StateCell, FRAME_SIZE};

use crate::encoder::EncoderPreset;
use crate::error::{CodecError, JitterError};

struct Inner {
    queue: VecDeque<Vec<u8>>,
}

/// Target depth `D`; hard capacity is `3D`, matching the teacher-original's
/// actual ring allocation (`buf(depth * 3)` in `netbuf.cpp`) rather than
/// the `2D` figure quoted in some of its prose.
pub struct JitterBuffer {
    depth: usize,
    capacity: usize,
    max_packet_size: usize,
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl JitterBuffer {
    pub fn new(depth: usize, preset: EncoderPreset) -> Self {
        let capacity = depth * 3;
        Self {
            depth,
            capacity,
            max_packet_size: preset.max_block_size(),
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a packet, blocking while the buffer is full.
    pub fn push(&self, packet: Vec<u8>) -> Result<(), JitterError> {
        if packet.len() > self.max_packet_size {
            return Err(JitterError::PacketTooLarge {
                max: self.max_packet_size,
                got: packet.len(),
            });
        }

        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        while guard.queue.len() >= self.capacity {
            guard = self.not_full.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
        guard.queue.push_back(packet);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pops the next packet, blocking while the buffer is empty.
    pub fn pop(&self) -> Vec<u8> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        while guard.queue.is_empty() {
            guard = self.not_empty.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
        let packet = guard.queue.pop_front().unwrap();
        self.not_full.notify_one();
        packet
    }
}

/// What a network receive task needs from a jitter buffer: somewhere to
/// push incoming (or lost, i.e. empty) packets. Implemented by both the
/// raw [`JitterBuffer`] and [`DecodingJitterBuffer`], so a receive task
/// doesn't need to know which one it's feeding.
pub trait PacketSink: Send + Sync {
    fn push(&self, packet: Vec<u8>) -> Result<(), JitterError>;
}

impl PacketSink for JitterBuffer {
    fn push(&self, packet: Vec<u8>) -> Result<(), JitterError> {
        JitterBuffer::push(self, packet)
    }
}

impl PacketSink for DecodingJitterBuffer {
    fn push(&self, packet: Vec<u8>) -> Result<(), JitterError> {
        DecodingJitterBuffer::push(self, packet)
    }
}

/// A jitter buffer that owns its own Opus decoder and hands callers fully
/// decoded frames, applying the catch-up averaging policy itself.
pub struct DecodingJitterBuffer {
    buffer: JitterBuffer,
    decoder: Mutex<OpusDecoder>,
    channels: u16,
    state: StateCell,
}

impl DecodingJitterBuffer {
    pub fn new(depth: usize, preset: EncoderPreset, channels: u16) -> Result<Self, CodecError> {
        let opus_channels = match channels {
            1 => audiopus::Channels::Mono,
            2 => audiopus::Channels::Stereo,
            other => {
                return Err(CodecError::ContractViolation {
                    expected: 1,
                    got: other as usize,
                })
            }
        };
        let decoder = OpusDecoder::new(SampleRate::Hz48000, opus_channels)?;
        Ok(Self {
            buffer: JitterBuffer::new(depth, preset),
            decoder: Mutex::new(decoder),
            channels,
            state: StateCell::new(State::Active),
        })
    }

    pub fn push(&self, packet: Vec<u8>) -> Result<(), JitterError> {
        self.buffer.push(packet)
    }

    fn decode_one(&self, decoder: &mut OpusDecoder, packet: &[u8], out: &mut Frame) -> Result<(), CodecError> {
        let bytes = if packet.is_empty() { None } else { Some(packet) };
        let n = decoder.decode_float(bytes, out, false)?;
        if n != out.len() {
            return Err(CodecError::ContractViolation {
                expected: out.len(),
                got: n,
            });
        }
        Ok(())
    }

    /// Blocks until a frame is available. When the queue still exceeds
    /// target depth after the primary pop, drains one extra packet and
    /// returns the sample-wise mean of both frames (checked *after* the
    /// primary pop, applied at most once per call).
    pub fn read(&self, frame_out: &mut Frame) -> Result<(), CodecError> {
        let frame_len = FRAME_SIZE * self.channels as usize;
        frame_out.resize(frame_len, 0.0);

        let primary = self.buffer.pop();
        let mut decoder = self.decoder.lock().unwrap_or_else(|e| e.into_inner());
        self.decode_one(&mut decoder, &primary, frame_out)?;

        if self.buffer.len() > self.buffer.depth() {
            let extra_packet = self.buffer.pop();
            let mut extra_frame = vec![0.0f32; frame_len];
            self.decode_one(&mut decoder, &extra_packet, &mut extra_frame)?;
            for (sample, extra) in frame_out.iter_mut().zip(extra_frame.iter()) {
                *sample = (*sample + *extra) / 2.0;
            }
        }

        Ok(())
    }
}

impl Controllable for DecodingJitterBuffer {
    fn start(&self) -> Result<(), BoxError> {
        self.state.set(State::Active);
        Ok(())
    }
    fn stop(&self) -> Result<(), BoxError> {
        self.state.set(State::Stopped);
        Ok(())
    }
    fn state(&self) -> State {
        self.state.get()
    }
}

impl Source for DecodingJitterBuffer {
    fn channels(&self) -> u16 {
        self.channels
    }
    fn wait_active(&self) {
        self.state.wait_active();
    }
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }
}

impl RawSource for DecodingJitterBuffer {
    /// Delegates to the inherent [`Self::read`], converting `CodecError`
    /// into the crate-wide `BoxError` at the trait boundary so a
    /// `DecodingJitterBuffer` can sit directly behind a `Player`.
    fn read(&self, frame: &mut Frame) -> Result<(), BoxError> {
        self.wait_active();
        DecodingJitterBuffer::read(self, frame).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn raw_source_read_pulls_a_full_frame_from_a_pushed_packet() {
        let mut encoder = audiopus::coder::Encoder::new(
            SampleRate::Hz48000,
            audiopus::Channels::Mono,
            audiopus::Application::Voip,
        )
        .unwrap();
        let samples = vec![0.0f32; FRAME_SIZE];
        let mut packet = vec![0u8; 128];
        let n = encoder.encode_float(&samples, &mut packet).unwrap();
        packet.truncate(n);

        let buf = DecodingJitterBuffer::new(3, EncoderPreset::Voice, 1).unwrap();
        buf.push(packet).unwrap();

        let mut frame = Vec::new();
        auris_core::RawSource::read(&buf, &mut frame).unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(auris_core::Source::channels(&buf), 1);
    }

    fn encode_constant(encoder: &mut audiopus::coder::Encoder, amplitude: f32) -> Vec<u8> {
        let samples = vec![amplitude; FRAME_SIZE];
        let mut packet = vec![0u8; EncoderPreset::Voice.max_block_size()];
        let n = encoder.encode_float(&samples, &mut packet).unwrap();
        packet.truncate(n);
        packet
    }

    #[test]
    fn catch_up_step_returns_the_element_wise_mean_of_the_two_decoded_frames() {
        let mut encoder = audiopus::coder::Encoder::new(
            SampleRate::Hz48000,
            audiopus::Channels::Mono,
            audiopus::Application::Voip,
        )
        .unwrap();
        let silent = encode_constant(&mut encoder, 0.0);
        let loud = encode_constant(&mut encoder, 0.5);
        let filler = encode_constant(&mut encoder, 0.0);

        // A fresh decoder, fed the same two packets in the same order the
        // buffer below will decode them in, is deterministic: it's the
        // independent expectation the catch-up average is checked against.
        let mut reference_decoder =
            OpusDecoder::new(SampleRate::Hz48000, audiopus::Channels::Mono).unwrap();
        let mut expected_primary = vec![0.0f32; FRAME_SIZE];
        reference_decoder
            .decode_float(Some(silent.as_slice()), &mut expected_primary, false)
            .unwrap();
        let mut expected_extra = vec![0.0f32; FRAME_SIZE];
        reference_decoder
            .decode_float(Some(loud.as_slice()), &mut expected_extra, false)
            .unwrap();
        let expected_mean: Vec<f32> = expected_primary
            .iter()
            .zip(expected_extra.iter())
            .map(|(a, b)| (a + b) / 2.0)
            .collect();

        // depth=1: after the primary pop the queue still holds 2 packets
        // (2 > 1), so exactly one catch-up step fires, consuming `silent`
        // as the primary pop and `loud` as the extra one; `filler` is left
        // queued.
        let buf = DecodingJitterBuffer::new(1, EncoderPreset::Voice, 1).unwrap();
        buf.push(silent).unwrap();
        buf.push(loud).unwrap();
        buf.push(filler).unwrap();

        let mut frame = Vec::new();
        buf.read(&mut frame).unwrap();
        assert_eq!(frame, expected_mean);
        assert_eq!(buf.buffer.len(), 1);
    }

    #[test]
    fn push_seven_then_read_twice_matches_the_depth_three_occupancy_scenario() {
        let mut encoder = audiopus::coder::Encoder::new(
            SampleRate::Hz48000,
            audiopus::Channels::Mono,
            audiopus::Application::Voip,
        )
        .unwrap();
        let buf = DecodingJitterBuffer::new(3, EncoderPreset::Voice, 1).unwrap();
        for _ in 0..7 {
            buf.push(encode_constant(&mut encoder, 0.0)).unwrap();
        }
        assert_eq!(buf.buffer.len(), 7);

        let mut frame = Vec::new();
        buf.read(&mut frame).unwrap();
        // Primary pop (7 -> 6), then 6 > depth(3) triggers one catch-up
        // pop (6 -> 5).
        assert_eq!(buf.buffer.len(), 5);

        buf.read(&mut frame).unwrap();
        // Primary pop (5 -> 4), then 4 > depth(3) triggers a second
        // catch-up pop (4 -> 3), landing on the depth-three scenario's
        // final occupancy of 3.
        assert_eq!(buf.buffer.len(), 3);
    }

    #[test]
    fn push_then_pop_preserves_fifo_order() {
        let buf = JitterBuffer::new(3, EncoderPreset::Voice);
        buf.push(vec![1]).unwrap();
        buf.push(vec![2]).unwrap();
        assert_eq!(buf.pop(), vec![1]);
        assert_eq!(buf.pop(), vec![2]);
    }

    #[test]
    fn oversized_packet_is_rejected() {
        let buf = JitterBuffer::new(3, EncoderPreset::Voice);
        let oversized = vec![0u8; EncoderPreset::Voice.max_block_size() + 1];
        let err = buf.push(oversized).unwrap_err();
        assert!(matches!(err, JitterError::PacketTooLarge { .. }));
    }

    #[test]
    fn capacity_is_three_times_depth() {
        let buf = JitterBuffer::new(4, EncoderPreset::Voice);
        assert_eq!(buf.capacity(), 12);
    }

    #[test]
    fn push_blocks_while_full_and_unblocks_on_pop() {
        let buf = Arc::new(JitterBuffer::new(1, EncoderPreset::Voice));
        for _ in 0..buf.capacity() {
            buf.push(vec![0]).unwrap();
        }
        assert_eq!(buf.len(), buf.capacity());

        let writer = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            writer.push(vec![9]).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        buf.pop();
        handle.join().unwrap();
    }

    #[test]
    fn pop_blocks_while_empty_and_unblocks_on_push() {
        let buf = Arc::new(JitterBuffer::new(2, EncoderPreset::Voice));
        let reader = Arc::clone(&buf);
        let handle = thread::spawn(move || reader.pop());

        thread::sleep(Duration::from_millis(50));
        buf.push(vec![7]).unwrap();
        assert_eq!(handle.join().unwrap(), vec![7]);
    }
}
