//! Error types for Cascade
//!
//! Every failure that can reach a continuation is a `CascadeError`. The enum is
//! `Clone` because re-runnable computations may hand the same failure to more
//! than one continuation.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures surfaced by the network boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Request to {url} failed with HTTP status {code}")]
    Status { url: String, code: u16 },
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

// ----------------------------------------------------------------------------
// Core Error Type
// ----------------------------------------------------------------------------

/// Core error type for asynchronous computations and resource loading
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    /// A caller-supplied closure reported a failure
    #[error("Computation failed: {message}")]
    Computation { message: String },

    /// A caller-supplied closure panicked; the panic was caught at the boundary
    #[error("Computation panicked: {message}")]
    Panicked { message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {reason}")]
    Decode { reason: String },

    #[error("Encode error: {reason}")]
    Encode { reason: String },

    /// Raised by the identity loader, which never has anything to offer
    #[error("No loader is able to provide the resource")]
    NoLoader,

    #[error("Cache miss for {url}")]
    CacheMiss { url: String },

    /// Storing a value found further down a loader chain into an earlier
    /// tier failed. Chains stop at this error instead of trying later tiers.
    #[error("Write-back failed: {source}")]
    WriteBack { source: Box<CascadeError> },

    #[error("I/O error: {reason}")]
    Io { reason: String },

    /// A continuation was dropped before anything was delivered to it
    #[error("Computation was abandoned before delivering a result")]
    Abandoned,

    #[error("Executor error: {reason}")]
    Executor { reason: String },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl From<std::io::Error> for CascadeError {
    fn from(err: std::io::Error) -> Self {
        CascadeError::Io {
            reason: err.to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl CascadeError {
    /// Create a computation error with a message
    pub fn computation<T: Into<String>>(message: T) -> Self {
        CascadeError::Computation {
            message: message.into(),
        }
    }

    /// Create a panic error with the panic payload text
    pub fn panicked<T: Into<String>>(message: T) -> Self {
        CascadeError::Panicked {
            message: message.into(),
        }
    }

    /// Create a decode error with a reason
    pub fn decode<T: Into<String>>(reason: T) -> Self {
        CascadeError::Decode {
            reason: reason.into(),
        }
    }

    /// Create an encode error with a reason
    pub fn encode<T: Into<String>>(reason: T) -> Self {
        CascadeError::Encode {
            reason: reason.into(),
        }
    }

    /// Wrap a failed write-back; an error that already is one is kept as is
    pub fn write_back(err: CascadeError) -> Self {
        match err {
            CascadeError::WriteBack { .. } => err,
            other => CascadeError::WriteBack {
                source: Box::new(other),
            },
        }
    }

    /// Create a cache miss error for a URL
    pub fn cache_miss<T: Into<String>>(url: T) -> Self {
        CascadeError::CacheMiss { url: url.into() }
    }

    /// Create an I/O error with a reason
    pub fn io<T: Into<String>>(reason: T) -> Self {
        CascadeError::Io {
            reason: reason.into(),
        }
    }

    /// Create an executor error with a reason
    pub fn executor_error<T: Into<String>>(reason: T) -> Self {
        CascadeError::Executor {
            reason: reason.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        CascadeError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an HTTP status failure
    pub fn http_status<U: Into<String>>(url: U, code: u16) -> Self {
        CascadeError::Transport(TransportError::Status {
            url: url.into(),
            code,
        })
    }

    /// Create a transport-level request failure
    pub fn request_failed<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        CascadeError::Transport(TransportError::Request {
            url: url.into(),
            reason: reason.into(),
        })
    }

    pub fn is_cache_miss(&self) -> bool {
        matches!(self, CascadeError::CacheMiss { .. })
    }

    pub fn is_write_back(&self) -> bool {
        matches!(self, CascadeError::WriteBack { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CascadeError::Transport(_))
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, CascadeError>;
pub type CascadeResult<T> = Result<T>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_converts_into_cascade_error() {
        let err: CascadeError = TransportError::Status {
            url: "https://example.com".into(),
            code: 404,
        }
        .into();
        assert!(err.is_transport());
        assert_eq!(err, CascadeError::http_status("https://example.com", 404));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_io_error_conversion_keeps_reason() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = CascadeError::from(io);
        assert_eq!(err, CascadeError::io("missing file"));
    }

    #[test]
    fn test_cache_miss_predicate() {
        assert!(CascadeError::cache_miss("a").is_cache_miss());
        assert!(!CascadeError::NoLoader.is_cache_miss());
    }

    #[test]
    fn test_write_back_wraps_once() {
        let err = CascadeError::write_back(CascadeError::io("disk full"));
        assert!(err.is_write_back());
        assert_eq!(CascadeError::write_back(err.clone()), err);
        assert!(err.to_string().contains("disk full"));
    }
}
