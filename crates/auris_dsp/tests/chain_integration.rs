//! Assembles a chain the way a real pipeline would - noise suppression
//! ahead of volume - and checks the processors compose: toggling one
//! doesn't disturb the other, and the whole chain still produces finite
//! output end to end.

use auris_dsp::{DspChain, NoiseSuppressor, VolumeProcessor};

const NATIVE_FRAME: usize = 480;

#[test]
fn noise_suppression_then_volume_runs_in_assembly_order_and_stays_finite() {
    let mut chain = DspChain::new(1);
    chain.add(NoiseSuppressor::new(1).unwrap());
    let volume = VolumeProcessor::new();
    volume.set(50.0);
    chain.add(volume);

    let mut buffer = vec![0.2_f32; NATIVE_FRAME * 2];
    chain.process(&mut buffer);

    assert!(buffer.iter().all(|s| s.is_finite()));
}

#[test]
fn disabling_noise_suppression_mid_chain_still_lets_volume_run() {
    let mut chain = DspChain::new(1);
    let suppressor = NoiseSuppressor::new(1).unwrap();
    suppressor.set_enabled(false);
    chain.add(suppressor);
    let volume = VolumeProcessor::new();
    volume.set(200.0);
    chain.add(volume);

    let mut buffer = vec![0.1_f32; NATIVE_FRAME];
    chain.process(&mut buffer);

    assert!(buffer.iter().all(|&s| (s - 0.2).abs() < 1e-5));
}

#[test]
fn resetting_the_chain_clears_suppressor_history_without_erroring() {
    let mut chain = DspChain::new(1);
    chain.add(NoiseSuppressor::new(1).unwrap());
    chain.add(VolumeProcessor::new());

    let mut buffer = vec![0.3_f32; NATIVE_FRAME];
    chain.process(&mut buffer);
    chain.reset();

    let mut buffer = vec![0.3_f32; NATIVE_FRAME];
    chain.process(&mut buffer);
    assert!(buffer.iter().all(|s| s.is_finite()));
}
