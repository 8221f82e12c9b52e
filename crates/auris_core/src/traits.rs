//! The polymorphic contracts stages are built against: `Source` and its
//! two specializations (`RawSource` for PCM stages, `PacketSource` for
//! encoded stages), plus `Output` and `Reconfigurable`.
//!
//! A wrapper stage - an encoder wrapping a `RawSource`, a decoder wrapping
//! a `PacketSource` - implements only the data transform and forwards
//! `start`/`stop`/`state`/`channels`/`wait_active` to the inner source.

use std::sync::{Arc, MutexGuard};

use crate::error::BoxError;
use crate::frame::{Frame, State};

/// Start/stop/state surface every pipeline stage exposes.
pub trait Controllable: Send + Sync {
    fn start(&self) -> Result<(), BoxError>;
    fn stop(&self) -> Result<(), BoxError>;
    fn state(&self) -> State;
}

/// A stage that produces data on demand and can be asked to block until
/// it is no longer `Stopped`.
pub trait Source: Controllable {
    fn channels(&self) -> u16;

    /// Blocks the calling thread until `state()` is not `Stopped`.
    fn wait_active(&self);

    /// Locks this stage's state mutex and returns the guard, so a caller
    /// can read `*guard` and decide what to do before anyone else can
    /// observe or flip the state.
    fn lock_state(&self) -> MutexGuard<'_, State>;

    /// Releases a guard obtained from `lock_state`. Rust's RAII already
    /// drops the lock at scope exit; this only exists so call sites can
    /// keep the explicit lock/unlock symmetry the rest of the pipeline
    /// uses around state transitions.
    fn unlock_state(&self, guard: MutexGuard<'_, State>) {
        drop(guard);
    }
}

/// A source of raw PCM frames (a device recorder, a decoder's output).
///
/// Takes `&self`, not `&mut self`: stages are shared via `Arc<dyn
/// RawSource>` between the thread driving them and the reconfiguration
/// registry, so any mutable state they need is behind their own interior
/// mutability (a `Mutex`, an atomic), the same way the original's
/// `shared_ptr`-held sources were accessed from multiple call sites.
pub trait RawSource: Source {
    /// Fills `frame` with exactly one frame's worth of samples. `frame`
    /// is resized by the implementation; callers must not assume its
    /// prior length is preserved.
    fn read(&self, frame: &mut Frame) -> Result<(), BoxError>;
}

/// A source of encoded packets (an encoder's output, a jitter buffer's
/// output before it reaches a decoder).
pub trait PacketSource: Source {
    fn read_packet(&self) -> Result<Vec<u8>, BoxError>;
}

/// A sink for raw PCM frames: a playback device, or a network transmitter
/// that encodes and frames the data itself (see `auris-net::RtpOutput`).
pub trait Output: Send + Sync {
    fn write(&self, frame: &Frame) -> Result<(), BoxError>;
}

/// A stage whose internal state must be rebuilt when the OS's default
/// audio device changes. Implementors register themselves with
/// [`crate::registry`] on construction and deregister on drop.
pub trait Reconfigurable: Send + Sync {
    fn reconf(&self) -> Result<(), BoxError>;
}

// `Recorder::new` and other constructors hand back `Arc<Self>` so a stage
// can be shared between the thread driving it and the reconfiguration
// registry; these let an `Arc<T>` stand in for `T` anywhere the contracts
// above are expected, the same way `Box<dyn Trait>` forwarding works.

impl<T: Controllable + ?Sized> Controllable for Arc<T> {
    fn start(&self) -> Result<(), BoxError> {
        (**self).start()
    }
    fn stop(&self) -> Result<(), BoxError> {
        (**self).stop()
    }
    fn state(&self) -> State {
        (**self).state()
    }
}

impl<T: Source + ?Sized> Source for Arc<T> {
    fn channels(&self) -> u16 {
        (**self).channels()
    }
    fn wait_active(&self) {
        (**self).wait_active()
    }
    fn lock_state(&self) -> MutexGuard<'_, State> {
        (**self).lock_state()
    }
}

impl<T: RawSource + ?Sized> RawSource for Arc<T> {
    fn read(&self, frame: &mut Frame) -> Result<(), BoxError> {
        (**self).read(frame)
    }
}

impl<T: PacketSource + ?Sized> PacketSource for Arc<T> {
    fn read_packet(&self) -> Result<Vec<u8>, BoxError> {
        (**self).read_packet()
    }
}

impl<T: Output + ?Sized> Output for Arc<T> {
    fn write(&self, frame: &Frame) -> Result<(), BoxError> {
        (**self).write(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BufSource;

    #[test]
    fn buf_source_finalizes_once_drained() {
        let src = BufSource::new(vec![vec![0.0; 4]], 1);
        assert_eq!(src.state(), State::Active);
        let mut frame = Vec::new();
        src.read(&mut frame).unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(src.state(), State::Finalized);
    }
}
