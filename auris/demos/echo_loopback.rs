//! Wires a capture device through noise suppression straight into the
//! default playback device - no codec, no network. Exercises the
//! Recorder -> DspChain -> Player -> PlaybackDevice path end to end.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use auris::{default_output_device, DspChain, NoiseSuppressor, PlaybackDevice, Player, Recorder};

fn main() {
    tracing_subscriber::fmt::init();

    let channels: u16 = 1;
    let mut dsp = DspChain::new(channels as usize);
    dsp.add(NoiseSuppressor::new(channels as usize).expect("noise suppressor"));

    let recorder = Recorder::new(channels, dsp).expect("open default input device");
    let cpal_out = default_output_device().expect("find default output device");
    let playback = PlaybackDevice::open(&cpal_out, channels).expect("open default output device");

    let source: Arc<Recorder> = recorder;
    let pump = Player::new(source, playback, || {
        tracing::info!("echo loopback source finalized");
    });

    tracing::info!("echo loopback running, Ctrl+C to stop");
    loop {
        thread::sleep(Duration::from_secs(60));
        let _ = &pump;
    }
}
