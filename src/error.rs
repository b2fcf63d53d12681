//! Unified error type.

/// The error type returned by reqlog's fallible operations.
///
/// Application errors never pass through this type: handlers return a
/// [`BoxError`] which the logging middleware hands back untouched. `Error`
/// covers the server's socket failures and connection takeover.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The response writer cannot hand over its connection.
    #[error("hijack not supported")]
    HijackNotSupported,

    /// The connection was already taken by an earlier `hijack` call.
    #[error("connection already hijacked")]
    AlreadyHijacked,
}

/// Error type returned by handlers. Any application error fits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
