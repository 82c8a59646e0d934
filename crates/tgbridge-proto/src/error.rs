//! Error types for the IRC protocol engine.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Failures raised by the wire-protocol engine.
///
/// Inbound lines are parsed leniently and never fail on content; only
/// framing, transport and outbound size limits produce errors. The caller
/// treats [`Connect`](ProtocolError::Connect) and [`Io`](ProtocolError::Io)
/// as disconnect triggers, while [`LineTooLong`](ProtocolError::LineTooLong)
/// on the send path rejects the offending line without touching the
/// connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// DNS resolution or connection establishment failed.
    #[error("connect error: {0}")]
    Connect(#[source] std::io::Error),

    /// Mid-session read or write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the wire limit. On the send path the line was not
    /// written; this is a programmer error, not a network fault.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual serialized length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// The configured host is not usable as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),
}
