//! TLS stream transport binding for wirebound.
//!
//! Two pieces, composed client-side into a chain:
//!
//! - [`TlsTransport`]: the encrypted byte-stream transport over one
//!   established TLS connection, with a per-connection receive timeout.
//!   The accept side upgrades an inbound TCP socket in place via
//!   [`TlsTransport::upgrade`].
//! - [`TlsConnector`]: the client-side connection factory. Built once from
//!   `(host, port, options)`, each [`TlsConnector::connect`] call performs
//!   TCP connect, TLS handshake, transport construction, and wrapping in a
//!   framed or buffered decorator, yielding a ready-to-use transport.
//!
//! ```no_run
//! use wirebound_tls::{ConnOpt, Timeout, TlsConnector, TlsOpt};
//!
//! # fn main() -> Result<(), wirebound_tls::ConnectError> {
//! let connector = TlsConnector::new("localhost", 9090, vec![
//!     ConnOpt::Framed(true),
//!     ConnOpt::RecvTimeout(Timeout::Millis(5000)),
//!     ConnOpt::TlsOptions(vec![TlsOpt::CaFile("certs/root-ca.pem".into())]),
//! ])?;
//! let transport = connector.connect()?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connector;
mod error;
mod insecure;
mod options;
mod stream;
mod transport;

pub use connector::TlsConnector;
pub use error::{AcceptError, ConnectError};
pub use options::{ConnOpt, RawTimeout, SockOpt, Timeout, TlsOpt, TransportOptions};
pub use transport::TlsTransport;
