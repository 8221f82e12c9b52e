//! auris-net - RTP framing for the voice pipeline's network send and
//! receive paths.
//!
//! The pipeline does not own a socket: callers hand `RtpOutput` anything
//! implementing [`DatagramSink`] and `RtpReceiver` anything implementing
//! [`DatagramSource`] (blanket impls cover `std::net::UdpSocket` for both);
//! the socket's binding, connection, and lifecycle stay entirely the
//! caller's concern.

mod error;
mod rtp;

pub use error::NetError;
pub use rtp::{DatagramSink, DatagramSource, RtpHeader, RtpOutput, RtpReceiver};
