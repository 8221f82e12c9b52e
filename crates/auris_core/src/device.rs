//! Device layer (C1): cpal-backed capture and playback devices exposing a
//! blocking frame-at-a-time contract instead of cpal's native callback
//! model.
//!
//! Capture and playback are each backed by an `rtrb` ring buffer between
//! the cpal callback and the blocking caller. Unlike a drop-tolerant
//! ring, `read`/`write` here block on a doorbell condvar until the ring
//! has data or room; `Overflow`/`Underflow` are reported as recoverable
//! errors on the *next* call rather than by silently skipping samples -
//! the no-silent-drop contract this layer exists to provide.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig as CpalStreamConfig};
use rtrb::RingBuffer;

use crate::error::{BoxError, DeviceError, DeviceResult};
use crate::frame::{Frame, FRAME_SIZE, SAMPLE_RATE};
use crate::traits::Output;

/// Returns the host's current default input device, as consulted by the
/// recorder at construction time and again on every `reconf()`.
pub fn default_input_device() -> DeviceResult<Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or(DeviceError::NoDevicesFound)
}

/// Returns the host's current default output device, as consulted by the
/// playback pump at construction time and again on every `reconf()`.
pub fn default_output_device() -> DeviceResult<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or(DeviceError::NoDevicesFound)
}

/// How many frames of headroom the ring buffer keeps between the cpal
/// callback and the blocking reader/writer.
const RING_FRAMES: usize = 8;

/// How long `read`/`write` wait for the doorbell before re-checking the
/// ring and, eventually, giving up with a transient error. Bounded so a
/// dead device never hangs the caller forever.
const WAIT_BUDGET: Duration = Duration::from_millis(200);
const POLL_INTERVAL: Duration = Duration::from_millis(2);

fn cpal_config(channels: u16) -> CpalStreamConfig {
    CpalStreamConfig {
        channels,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Fixed(FRAME_SIZE as u32),
    }
}

/// A condvar the audio callback rings every time it moves data, so the
/// blocking side of the ring doesn't have to busy-poll tightly.
#[derive(Default)]
struct Doorbell {
    lock: Mutex<()>,
    cv: Condvar,
}

impl Doorbell {
    fn ring(&self) {
        self.cv.notify_all();
    }

    fn wait_for(&self, budget: Duration) {
        let guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let _ = self.cv.wait_timeout(guard, budget);
    }
}

/// A capture device: cpal input stream -> rtrb ring -> blocking `read`.
pub struct CaptureDevice {
    _stream: Stream,
    consumer: Mutex<rtrb::Consumer<f32>>,
    doorbell: Arc<Doorbell>,
    overflowed: Arc<AtomicBool>,
    channels: u16,
}

impl CaptureDevice {
    pub fn open(device: &Device, channels: u16) -> DeviceResult<Self> {
        let ring_size = FRAME_SIZE * channels as usize * RING_FRAMES;
        let (mut producer, consumer) = RingBuffer::<f32>::new(ring_size);
        let doorbell = Arc::new(Doorbell::default());
        let overflowed = Arc::new(AtomicBool::new(false));

        let cb_doorbell = Arc::clone(&doorbell);
        let cb_overflowed = Arc::clone(&overflowed);

        let config = cpal_config(channels);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut written = 0usize;
                    if let Ok(mut chunk) = producer.write_chunk_uninit(data.len()) {
                        let (first, second) = chunk.as_mut_slices();
                        for (slot, sample) in first.iter_mut().zip(data.iter()) {
                            slot.write(*sample);
                        }
                        written += first.len();
                        for (slot, sample) in second.iter_mut().zip(data[first.len()..].iter()) {
                            slot.write(*sample);
                        }
                        written += second.len();
                        unsafe { chunk.commit_all() };
                    }
                    if written < data.len() {
                        cb_overflowed.store(true, Ordering::Relaxed);
                    }
                    cb_doorbell.ring();
                },
                |err| tracing::warn!(error = %err, "capture device stream error"),
                None,
            )
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            consumer: Mutex::new(consumer),
            doorbell,
            overflowed,
            channels,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Blocks until one frame's worth of samples is available, fills
    /// `frame` with them. Resizes `frame` to the channel-scaled frame
    /// length.
    pub fn read(&self, frame: &mut Frame) -> DeviceResult<()> {
        if self.overflowed.swap(false, Ordering::Relaxed) {
            tracing::warn!("capture ring buffer overflowed last period");
        }

        let needed = FRAME_SIZE * self.channels as usize;
        frame.resize(needed, 0.0);

        let mut filled = 0usize;
        let mut remaining_budget = WAIT_BUDGET;
        loop {
            {
                let mut consumer = self.consumer.lock().unwrap_or_else(|e| e.into_inner());
                let available = consumer.slots().min(needed - filled);
                if available > 0 {
                    if let Ok(chunk) = consumer.read_chunk(available) {
                        let (first, second) = chunk.as_slices();
                        frame[filled..filled + first.len()].copy_from_slice(first);
                        let mid = filled + first.len();
                        frame[mid..mid + second.len()].copy_from_slice(second);
                        filled += first.len() + second.len();
                        chunk.commit_all();
                    }
                }
            }
            if filled >= needed {
                return Ok(());
            }
            if remaining_budget.is_zero() {
                return Err(DeviceError::Underflow);
            }
            let step = POLL_INTERVAL.min(remaining_budget);
            self.doorbell.wait_for(step);
            remaining_budget = remaining_budget.saturating_sub(step);
        }
    }
}

/// A playback device: blocking `write` -> rtrb ring -> cpal output stream.
pub struct PlaybackDevice {
    _stream: Stream,
    producer: Mutex<rtrb::Producer<f32>>,
    doorbell: Arc<Doorbell>,
    underflowed: Arc<AtomicBool>,
    channels: u16,
}

impl PlaybackDevice {
    pub fn open(device: &Device, channels: u16) -> DeviceResult<Self> {
        let ring_size = FRAME_SIZE * channels as usize * RING_FRAMES;
        let (producer, mut consumer) = RingBuffer::<f32>::new(ring_size);
        let doorbell = Arc::new(Doorbell::default());
        let underflowed = Arc::new(AtomicBool::new(false));

        let cb_doorbell = Arc::clone(&doorbell);
        let cb_underflowed = Arc::clone(&underflowed);

        let config = cpal_config(channels);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let available = consumer.slots().min(data.len());
                    if let Ok(chunk) = consumer.read_chunk(available) {
                        let (first, second) = chunk.as_slices();
                        data[..first.len()].copy_from_slice(first);
                        data[first.len()..first.len() + second.len()].copy_from_slice(second);
                        chunk.commit_all();
                    }
                    if available < data.len() {
                        data[available..].fill(0.0);
                        cb_underflowed.store(true, Ordering::Relaxed);
                    }
                    cb_doorbell.ring();
                },
                |err| tracing::warn!(error = %err, "playback device stream error"),
                None,
            )
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::OpenFailed(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            producer: Mutex::new(producer),
            doorbell,
            underflowed,
            channels,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Blocks until `frame` has fully been pushed into the ring for the
    /// output callback to pick up.
    pub fn write(&self, frame: &[f32]) -> DeviceResult<()> {
        if self.underflowed.swap(false, Ordering::Relaxed) {
            tracing::warn!("playback ring buffer underflowed last period");
        }

        let mut sent = 0usize;
        let mut remaining_budget = WAIT_BUDGET;
        loop {
            {
                let mut producer = self.producer.lock().unwrap_or_else(|e| e.into_inner());
                let room = producer.slots().min(frame.len() - sent);
                if room > 0 {
                    if let Ok(mut chunk) = producer.write_chunk_uninit(room) {
                        let (first, second) = chunk.as_mut_slices();
                        for (slot, sample) in first.iter_mut().zip(frame[sent..].iter()) {
                            slot.write(*sample);
                        }
                        let mid = sent + first.len();
                        for (slot, sample) in second.iter_mut().zip(frame[mid..].iter()) {
                            slot.write(*sample);
                        }
                        sent += first.len() + second.len();
                        unsafe { chunk.commit_all() };
                    }
                }
            }
            if sent >= frame.len() {
                return Ok(());
            }
            if remaining_budget.is_zero() {
                return Err(DeviceError::Overflow);
            }
            let step = POLL_INTERVAL.min(remaining_budget);
            self.doorbell.wait_for(step);
            remaining_budget = remaining_budget.saturating_sub(step);
        }
    }
}

impl Output for PlaybackDevice {
    fn write(&self, frame: &Frame) -> Result<(), BoxError> {
        PlaybackDevice::write(self, frame)?;
        Ok(())
    }
}
