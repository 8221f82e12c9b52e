//! The literal FEC and PLC packet sequences this decoder is built around.
//! Unlike `decoder.rs`'s unit tests (which use two-packet toy sequences
//! to isolate one code path at a time), these drive the decoder through
//! the full five- and four-packet sequences end to end and check that
//! every read still produces a full-length frame with no error surfaced.

use audiopus::SampleRate;

use auris_core::test_support::BufPacketSource;
use auris_core::{RawSource, FRAME_SIZE};
use auris_codec::Decoder;

fn opus_packet(amplitude: f32) -> Vec<u8> {
    let mut encoder =
        audiopus::coder::Encoder::new(SampleRate::Hz48000, audiopus::Channels::Mono, audiopus::Application::Voip)
            .unwrap();
    let samples = vec![amplitude; FRAME_SIZE];
    let mut out = vec![0u8; 128];
    let n = encoder.encode_float(&samples, &mut out).unwrap();
    out.truncate(n);
    out
}

/// `[P0, P1, P2, empty, P4]`: a single mid-stream loss recovered via FEC
/// from the packet that follows it. Every read still yields a full frame
/// and nothing is ever dropped.
#[test]
fn p0_p1_p2_empty_p4_recovers_the_loss_via_fec_and_drops_nothing() {
    let packets = vec![
        opus_packet(0.1),
        opus_packet(0.2),
        opus_packet(0.3),
        Vec::new(),
        opus_packet(0.5),
    ];
    let source = BufPacketSource::new(packets);
    let decoder = Decoder::new(source).unwrap();

    for _ in 0..5 {
        let mut frame = Vec::new();
        decoder.read(&mut frame).unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
    }
}

/// `[P0, empty, empty, P3]`: two consecutive losses concealed via PLC,
/// then a normal decode resumes once real packets return.
#[test]
fn p0_empty_empty_p3_conceals_both_losses_via_plc() {
    let packets = vec![opus_packet(0.1), Vec::new(), Vec::new(), opus_packet(0.4)];
    let source = BufPacketSource::new(packets);
    let decoder = Decoder::new(source).unwrap();

    for _ in 0..4 {
        let mut frame = Vec::new();
        decoder.read(&mut frame).unwrap();
        assert_eq!(frame.len(), FRAME_SIZE);
    }
}
