//! Error taxonomy for the codec stages and jitter buffer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("opus error: {0}")]
    Opus(#[from] audiopus::Error),

    #[error("codec contract violation: expected {expected} samples, got {got}")]
    ContractViolation { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum JitterError {
    #[error("packet too large for jitter buffer: max {max} bytes, got {got}")]
    PacketTooLarge { max: usize, got: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_display() {
        let err = CodecError::ContractViolation {
            expected: 960,
            got: 480,
        };
        assert_eq!(
            err.to_string(),
            "codec contract violation: expected 960 samples, got 480"
        );
    }

    #[test]
    fn test_packet_too_large_display() {
        let err = JitterError::PacketTooLarge { max: 128, got: 200 };
        assert_eq!(
            err.to_string(),
            "packet too large for jitter buffer: max 128 bytes, got 200"
        );
    }
}
