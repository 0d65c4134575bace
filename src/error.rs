//! Error types for pool operations
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type covering every caller-visible pool failure.
///
/// Factory failures (`create` / `destroy` rejections) are consumed by the
/// engine and re-published through the event bus; they never surface through
/// this type to a caller, with one exception: factory implementations use
/// [`Error::Factory`] as their own failure value.
#[derive(Error, Debug)]
pub enum Error {
    /// An acquire request waited longer than `acquire_timeout`.
    #[error("acquire timed out after {timeout_ms}ms")]
    Timeout {
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// A factory `destroy` call exceeded `destroy_timeout`.
    #[error("resource destroy timed out after {timeout_ms}ms")]
    DestroyTimeout {
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The waiter queue is full and no spare capacity exists.
    #[error("max waiting clients exceeded: {waiting} waiting, limit {max_waiting}")]
    QueueFull {
        /// Number of requests already waiting.
        waiting: usize,
        /// The configured `max_waiting_clients` cap.
        max_waiting: usize,
    },

    /// The pool is draining and cannot accept new acquire requests.
    #[error("pool is draining and cannot accept work")]
    Draining,

    /// `release` or `destroy` was called with a resource that has no
    /// active loan in this pool.
    #[error("resource is not currently borrowed from this pool")]
    UnknownResource,

    /// Pool configuration is invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// The error message.
        message: String,
    },

    /// A factory operation failed.
    ///
    /// This is the variant factory implementations return from `create`,
    /// `destroy`, and `validate`.
    #[error("factory error: {message}")]
    Factory {
        /// The error message.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a factory error with just a message.
    pub fn factory<S: Into<String>>(message: S) -> Self {
        Self::Factory {
            message: message.into(),
            source: None,
        }
    }

    /// Create a factory error wrapping an underlying error.
    pub fn factory_with<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Factory {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Timeouts and queue-full rejections are transient: the same request
    /// may succeed once resources are returned. Draining and unknown-resource
    /// errors are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::QueueFull { .. })
    }
}
