//! In-memory fixtures shared by this crate's own tests and by downstream
//! crates' tests (`auris-codec`, `auris-net`). Not meant for pipeline use.

use std::sync::Mutex;

use crate::error::BoxError;
use crate::frame::{Frame, State};
use crate::traits::{Controllable, RawSource, Source};

/// A `RawSource` that yields a fixed list of frames, then moves to
/// `Finalized` once drained.
pub struct BufSource {
    frames: Mutex<Vec<Frame>>,
    channels: u16,
    state: Mutex<State>,
}

impl BufSource {
    pub fn new(frames: Vec<Frame>, channels: u16) -> Self {
        Self {
            frames: Mutex::new(frames),
            channels,
            state: Mutex::new(State::Active),
        }
    }
}

impl Controllable for BufSource {
    fn start(&self) -> Result<(), BoxError> {
        *self.state.lock().unwrap() = State::Active;
        Ok(())
    }
    fn stop(&self) -> Result<(), BoxError> {
        *self.state.lock().unwrap() = State::Stopped;
        Ok(())
    }
    fn state(&self) -> State {
        let remaining = self.frames.lock().unwrap().len();
        let mut st = self.state.lock().unwrap();
        if remaining == 0 && *st != State::Finalized {
            *st = State::Finalized;
        }
        *st
    }
}

impl Source for BufSource {
    fn channels(&self) -> u16 {
        self.channels
    }
    fn wait_active(&self) {}
    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl RawSource for BufSource {
    fn read(&self, frame: &mut Frame) -> Result<(), BoxError> {
        let mut frames = self.frames.lock().unwrap();
        if frames.is_empty() {
            frame.clear();
            return Ok(());
        }
        *frame = frames.remove(0);
        Ok(())
    }
}

/// A `PacketSource` that yields a fixed list of packets (an empty `Vec`
/// stands in for a lost packet) in order, then finalizes.
pub struct BufPacketSource {
    packets: Mutex<Vec<Vec<u8>>>,
    state: Mutex<State>,
}

impl BufPacketSource {
    pub fn new(packets: Vec<Vec<u8>>) -> Self {
        Self {
            packets: Mutex::new(packets),
            state: Mutex::new(State::Active),
        }
    }
}

impl Controllable for BufPacketSource {
    fn start(&self) -> Result<(), BoxError> {
        *self.state.lock().unwrap() = State::Active;
        Ok(())
    }
    fn stop(&self) -> Result<(), BoxError> {
        *self.state.lock().unwrap() = State::Stopped;
        Ok(())
    }
    fn state(&self) -> State {
        let remaining = self.packets.lock().unwrap().len();
        let mut st = self.state.lock().unwrap();
        if remaining == 0 && *st != State::Finalized {
            *st = State::Finalized;
        }
        *st
    }
}

impl Source for BufPacketSource {
    fn channels(&self) -> u16 {
        1
    }
    fn wait_active(&self) {}
    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl crate::traits::PacketSource for BufPacketSource {
    fn read_packet(&self) -> Result<Vec<u8>, BoxError> {
        let mut packets = self.packets.lock().unwrap();
        if packets.is_empty() {
            return Ok(Vec::new());
        }
        Ok(packets.remove(0))
    }
}
