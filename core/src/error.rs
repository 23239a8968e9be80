use std::io;

use thiserror::Error;

/// Errors surfaced by transport operations.
///
/// Everything here is recoverable from the caller's point of view: the error
/// is returned, never swallowed, and the caller decides whether to drop the
/// connection or report upward.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An I/O failure from the underlying socket or stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read exceeded the configured receive timeout. The transport closes
    /// the underlying connection before returning this, so the handle is
    /// unusable afterward.
    #[error("read from {peer} timed out")]
    Timeout {
        /// Peer identity, for diagnostics.
        peer: String,
    },

    /// The transport is closed (or the peer disconnected mid-read).
    #[error("transport is closed")]
    Closed,

    /// An inbound or outbound frame exceeded the framed decorator's limit.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

impl TransportError {
    /// Whether this error indicates a dead connection rather than a
    /// malformed exchange.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Timeout { .. } | TransportError::Closed => true,
            TransportError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
            ),
            TransportError::FrameTooLarge { .. } => false,
        }
    }
}
