//! Wires a capture device through the voice encoder preset straight into
//! a decoder and out to the default playback device, entirely in process
//! (no socket involved). Exercises the Recorder -> Encoder -> Decoder ->
//! Player -> PlaybackDevice path end to end.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use auris::{default_output_device, Decoder, DspChain, Encoder, EncoderPreset, PlaybackDevice, Player, Recorder};

fn main() {
    tracing_subscriber::fmt::init();

    let channels: u16 = 1;
    let dsp = DspChain::new(channels as usize);
    let recorder = Recorder::new(channels, dsp).expect("open default input device");
    let encoder = Encoder::new(recorder, EncoderPreset::Voice).expect("build opus encoder");
    let decoder = Arc::new(Decoder::new(encoder).expect("build opus decoder"));

    let cpal_out = default_output_device().expect("find default output device");
    let playback = PlaybackDevice::open(&cpal_out, channels).expect("open default output device");

    let pump = Player::new(decoder, playback, || {
        tracing::info!("voice roundtrip source finalized");
    });

    tracing::info!("voice roundtrip running, Ctrl+C to stop");
    loop {
        thread::sleep(Duration::from_secs(60));
        let _ = &pump;
    }
}
