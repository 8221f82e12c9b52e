//! Error types for the RTP send path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("encoded packet ({got} bytes) exceeds the maximum RTP payload this sink accepts ({max} bytes)")]
    PayloadTooLarge { max: usize, got: usize },

    #[error("datagram send incomplete: sent {sent} of {total} bytes")]
    ShortSend { sent: usize, total: usize },

    #[error("datagram ({got} bytes) is shorter than the fixed RTP header ({min} bytes)")]
    Truncated { min: usize, got: usize },

    #[error(transparent)]
    Codec(#[from] auris_codec::CodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
