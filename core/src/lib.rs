//! Byte-stream transport contract shared by every wirebound transport
//! binding, plus the two outer decorators protocol layers compose with.
//!
//! A transport carries opaque bytes; it knows nothing about RPC message
//! encoding. Concrete bindings (TCP, TLS, in-memory) implement [`Transport`]
//! and are wrapped in either a [`FramedTransport`] or a
//! [`BufferedTransport`] before being handed to a protocol layer.

mod buffered;
mod error;
mod framed;
mod mem;
mod transport;

pub use buffered::BufferedTransport;
pub use error::TransportError;
pub use framed::FramedTransport;
pub use mem::MemoryTransport;
pub use transport::Transport;

/// Convenience alias used throughout the transport crates.
pub type Result<T> = std::result::Result<T, TransportError>;
