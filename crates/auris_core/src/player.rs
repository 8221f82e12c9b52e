//! The playback pump (C6): a dedicated thread that repeatedly reads from
//! a `RawSource` and writes to an `Output`, reacting to the source's
//! state on every iteration.
//!
//! State-lock then read-then-release: the pump locks the source's state,
//! decides what to do, and releases the lock *before* touching the
//! output - so a sibling stage changing the source's state never blocks
//! behind an in-flight device write.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::frame::{Frame, State};
use crate::traits::{Output, RawSource};

/// Runs one playback pump on its own thread until the source finalizes or
/// the pump is dropped.
pub struct Player {
    volume_bits: Arc<AtomicU32>,
    delete_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    /// `on_end_of_source` fires exactly once, when the source transitions
    /// to `Finalized`, from the pump's own thread.
    pub fn new<S, O, F>(source: Arc<S>, mut output: O, on_end_of_source: F) -> Self
    where
        S: RawSource + 'static,
        O: Output + 'static,
        F: FnOnce() + Send + 'static,
    {
        let volume_bits = Arc::new(AtomicU32::new(1.0_f32.to_bits()));
        let delete_flag = Arc::new(AtomicBool::new(false));

        let thread_volume = Arc::clone(&volume_bits);
        let thread_delete_flag = Arc::clone(&delete_flag);
        let on_end_of_source = Mutex::new(Some(on_end_of_source));

        let handle = thread::Builder::new()
            .name("auris-playback-pump".into())
            .spawn(move || {
                let mut frame: Frame = Vec::new();
                loop {
                    if thread_delete_flag.load(Ordering::Relaxed) {
                        return;
                    }

                    let guard = source.lock_state();
                    let current = *guard;
                    source.unlock_state(guard);

                    match current {
                        State::Active => {
                            if let Err(e) = source.read(&mut frame) {
                                tracing::warn!(error = %e, "playback pump: transient read error, continuing");
                                continue;
                            }
                            if frame.is_empty() {
                                continue;
                            }
                            let volume = f32::from_bits(thread_volume.load(Ordering::Relaxed));
                            if (volume - 1.0).abs() > f32::EPSILON {
                                for sample in frame.iter_mut() {
                                    *sample *= volume;
                                }
                            }
                            if let Err(e) = output.write(&frame) {
                                tracing::warn!(error = %e, "playback pump: transient output error, continuing");
                            }
                        }
                        State::Stopped => {
                            source.wait_active();
                        }
                        State::Finalized => {
                            if let Some(cb) = on_end_of_source.lock().unwrap().take() {
                                cb();
                            }
                            return;
                        }
                    }
                }
            })
            .expect("failed to spawn playback pump thread");

        Self {
            volume_bits,
            delete_flag,
            handle: Some(handle),
        }
    }

    /// Sets playback volume, 0.0 (silent) to 2.0 (2x gain), applied
    /// multiplicatively to every sample the pump writes out.
    pub fn set_volume(&self, volume: f32) {
        self.volume_bits
            .store(volume.clamp(0.0, 2.0).to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.delete_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
