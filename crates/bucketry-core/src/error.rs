//! Error types and result aliases for Bucketry.
//!
//! Every failure class is fatal for the run: a report aggregated from
//! partial or unverified input would silently misrepresent totals, so
//! nothing here is retried or skipped automatically.

/// The result type used throughout Bucketry.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing an inventory report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A manifest or data file could not be transferred.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transfer failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A digest check failed on the manifest or a data file.
    #[error("integrity check failed for {location}: expected {expected}, computed {computed}")]
    Integrity {
        /// Location of the object that failed verification.
        location: String,
        /// The digest the manifest promised.
        expected: String,
        /// The digest computed from the received bytes.
        computed: String,
    },

    /// A data file uses an unsupported or malformed container format.
    #[error("format error: {0}")]
    Format(String),

    /// The manifest is missing required fields or is not valid JSON.
    #[error("manifest schema error: {0}")]
    Schema(String),

    /// A requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new transport error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new transport error with a source cause.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::transport_with_source("failed to read object", io);
        assert!(err.to_string().contains("failed to read object"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_integrity_error_message_names_both_digests() {
        let err = Error::Integrity {
            location: "s3://bucket/data/file.parquet".to_string(),
            expected: "abc".to_string(),
            computed: "def".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("abc"));
        assert!(rendered.contains("def"));
        assert!(rendered.contains("s3://bucket/data/file.parquet"));
    }
}
