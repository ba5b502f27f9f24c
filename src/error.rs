//! Error taxonomy for retrievals.
//!
//! Every fallible operation in the crate returns [`Result`]. Failures are
//! classified so callers can decide whether a retry with fresh queries is
//! worthwhile.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by configuration, dispatch and reconstruction
#[derive(Debug, Error)]
pub enum HybridPirError {
    /// Invalid parameters or an index outside the database
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single target failed at the transport level
    #[error("network error with {target}: {reason}")]
    Network { target: String, reason: String },

    /// Fewer usable responses than reconstruction needs
    #[error("quorum not reached: {received} of {required} targets answered")]
    Quorum { required: usize, received: usize },

    /// Decryption or decoding of a response failed
    #[error("cryptographic failure: {0}")]
    Crypto(String),

    /// Reconstructed data has the wrong size
    #[error("shape mismatch: expected {expected} bytes, got {actual}")]
    Shape { expected: usize, actual: usize },

    /// The whole-call deadline expired
    #[error("retrieval deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// Malformed wire message
    #[error("codec error: {0}")]
    Codec(String),
}

impl HybridPirError {
    /// Whether a fresh attempt (new seeds, new queries) might succeed.
    ///
    /// Configuration problems and corrupted replies are deterministic
    /// failures; missing targets and deadlines are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HybridPirError::Network { .. } | HybridPirError::Quorum { .. } | HybridPirError::Timeout(_)
        )
    }
}

impl From<bincode::Error> for HybridPirError {
    fn from(e: bincode::Error) -> Self {
        HybridPirError::Codec(e.to_string())
    }
}

/// Stream I/O failures carry no address, so the target is named generically
impl From<std::io::Error> for HybridPirError {
    fn from(e: std::io::Error) -> Self {
        HybridPirError::Network {
            target: "stream".to_string(),
            reason: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HybridPirError>;

/// Build a [`HybridPirError::Configuration`] from a format string
#[macro_export]
macro_rules! config_err {
    ($($arg:tt)*) => {
        $crate::error::HybridPirError::Configuration(format!($($arg)*))
    };
}

/// Build a [`HybridPirError::Crypto`] from a format string
#[macro_export]
macro_rules! crypto_err {
    ($($arg:tt)*) => {
        $crate::error::HybridPirError::Crypto(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(HybridPirError::Quorum { required: 2, received: 1 }.is_retryable());
        assert!(HybridPirError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(HybridPirError::Network {
            target: "a".into(),
            reason: "refused".into()
        }
        .is_retryable());
        assert!(!config_err!("bad {}", 1).is_retryable());
        assert!(!crypto_err!("noise").is_retryable());
        assert!(!HybridPirError::Shape { expected: 8, actual: 4 }.is_retryable());
    }

    #[test]
    fn test_io_errors_are_network_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed");
        let err = HybridPirError::from(io);
        assert!(matches!(err, HybridPirError::Network { ref reason, .. } if reason == "closed"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_display() {
        let e = HybridPirError::Quorum { required: 3, received: 2 };
        assert_eq!(e.to_string(), "quorum not reached: 2 of 3 targets answered");
        let e = config_err!("index {} out of range", 9);
        assert_eq!(e.to_string(), "configuration error: index 9 out of range");
    }
}
