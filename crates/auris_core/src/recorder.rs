//! The recorder (C3): a `RawSource` that pulls PCM frames from the
//! capture device and runs them through a DSP chain before handing them
//! to callers.

use std::sync::{Arc, Mutex, MutexGuard};

use auris_dsp::DspChain;

use crate::device::{self, CaptureDevice};
use crate::error::BoxError;
use crate::frame::{Frame, State};
use crate::registry::RegistryHandle;
use crate::state::StateCell;
use crate::traits::{Controllable, RawSource, Reconfigurable, Source};

/// Pulls frames from the default input device, running them through a DSP
/// chain in place before returning them. `start`/`stop` gate whether
/// `read` produces live audio or blocks; `reconf` rebuilds the underlying
/// device against whatever is now the default input, preserving whether
/// the recorder was active.
pub struct Recorder {
    state: StateCell,
    device: Mutex<CaptureDevice>,
    dsp: Mutex<DspChain>,
    channels: u16,
    _registry_handle: Mutex<Option<RegistryHandle>>,
}

impl Recorder {
    /// Opens the current default input device and wraps it. `dsp` is the
    /// chain applied to every frame this recorder reads, in the order it
    /// was assembled.
    pub fn new(channels: u16, dsp: DspChain) -> Result<Arc<Self>, BoxError> {
        let cpal_device = device::default_input_device()?;
        let capture = CaptureDevice::open(&cpal_device, channels)?;

        let recorder = Arc::new(Self {
            state: StateCell::new(State::Active),
            device: Mutex::new(capture),
            dsp: Mutex::new(dsp),
            channels,
            _registry_handle: Mutex::new(None),
        });

        let reconfigurable: Arc<dyn Reconfigurable> = recorder.clone() as Arc<dyn Reconfigurable>;
        let handle = RegistryHandle::register(&reconfigurable);
        *recorder._registry_handle.lock().unwrap() = Some(handle);

        Ok(recorder)
    }
}

impl Controllable for Recorder {
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

impl Source for Recorder {
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

impl RawSource for Recorder {
    /// Holds the state lock across the `state()` check and the device
    /// read itself, so a `stop()` landing after `wait_active()` returns
    /// but before the device is touched can't race a read into returning
    /// live audio after the stage is observed `Stopped`.
    fn read(&self, frame: &mut Frame) -> Result<(), BoxError> {
        self.wait_active();

        let guard = self.lock_state();
        if *guard != State::Active {
            self.unlock_state(guard);
            frame.clear();
            return Ok(());
        }
        let result = {
            let device = self.device.lock().unwrap_or_else(|e| e.into_inner());
            device.read(frame)
        };
        self.unlock_state(guard);
        result?;

        self.dsp
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .process(frame);
        Ok(())
    }
}

impl Reconfigurable for Recorder {
    fn reconf(&self) -> Result<(), BoxError> {
        let was_active = self.state() == State::Active;
        let cpal_device = device::default_input_device()?;
        let capture = CaptureDevice::open(&cpal_device, self.channels)?;
        *self.device.lock().unwrap_or_else(|e| e.into_inner()) = capture;
        if was_active {
            self.state.set(State::Active);
        }
        tracing::info!("recorder reconfigured against new default input device");
        Ok(())
    }
}
