use std::io;

use thiserror::Error;

/// Errors from the client-side connection factory.
///
/// Every variant is returned to the caller; nothing here terminates the
/// process. A failed connect attempt leaks no socket: the chain closes
/// whatever it opened before the error propagates.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// A connector option failed its guard at factory-construction time.
    /// Option validation is deliberately strict, unlike the permissive
    /// receive-timeout fallback at transport construction.
    #[error("invalid connector option: {0}")]
    Config(String),

    /// TCP connect failed. Nothing further was attempted.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr:   String,
        source: io::Error,
    },

    /// The server rejected the TLS handshake. The TCP socket was closed
    /// before this was returned.
    #[error("TLS handshake with {addr} rejected: {source}")]
    Handshake {
        addr:   String,
        source: rustls::Error,
    },

    /// The TLS upgrade failed for a reason other than an explicit handshake
    /// rejection (connection dropped mid-handshake, socket error). Wrapped
    /// and reported as-is; the TCP socket was closed before returning.
    #[error("TLS upgrade of connection to {addr} failed: {source}")]
    Upgrade {
        addr:   String,
        source: io::Error,
    },
}

/// Errors from the accept-side TLS upgrade.
///
/// A failed inbound handshake leaves no well-defined transport to recover,
/// so these are fatal for the connection's handler: the accept loop should
/// drop this connection and move on. Nothing else is affected.
#[derive(Debug, Error)]
pub enum AcceptError {
    /// The TLS server options could not be turned into a working
    /// configuration (missing or unparsable certificate material).
    #[error("invalid TLS server options: {0}")]
    Config(String),

    /// The handshake failed with an explicit TLS-level reason.
    #[error("TLS accept handshake rejected: {0}")]
    Handshake(rustls::Error),

    /// The handshake produced an unexpected non-TLS outcome. The details
    /// were logged when this was raised.
    #[error("TLS accept handshake failed")]
    HandshakeFailed,
}
