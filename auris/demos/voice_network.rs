//! Wires `SendPipeline` and `ReceivePipeline` together over a real loopback
//! UDP socket: capture device -> DSP -> Opus encode -> RTP -> UDP -> RTP
//! receive task -> jitter buffer -> Opus decode -> default playback
//! device. Exercises the full network path this crate exists to provide,
//! rather than the in-process shortcuts `echo_loopback`/`voice_roundtrip`
//! take.

use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use auris::{EncoderPreset, PipelineConfig, ReceivePipeline, SendPipeline};

fn main() {
    tracing_subscriber::fmt::init();

    let send_socket = UdpSocket::bind("127.0.0.1:0").expect("bind send socket");
    let recv_socket = UdpSocket::bind("127.0.0.1:0").expect("bind recv socket");
    let recv_addr = recv_socket.local_addr().expect("recv socket has local addr");
    send_socket.connect(recv_addr).expect("connect send socket to recv socket");
    recv_socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .expect("set recv timeout so shutdown is prompt");

    let config = PipelineConfig::voice();
    let receive = ReceivePipeline::new(config.clone(), EncoderPreset::Voice, recv_socket)
        .expect("assemble receive pipeline");
    let send = SendPipeline::new(config, EncoderPreset::Voice, send_socket)
        .expect("assemble send pipeline");

    tracing::info!(%recv_addr, "voice network demo running, Ctrl+C to stop");
    loop {
        thread::sleep(Duration::from_secs(60));
        let _ = (&send, &receive);
    }
}
