use std::{io, net::TcpStream, path::PathBuf, time::Duration};

use crate::error::ConnectError;

/// A duration that may be unbounded. Factory-side timeout values must be
/// positive; `Millis(0)` is rejected when the option list is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// No bound; the operation may block indefinitely.
    Infinite,
    /// Bound in milliseconds.
    Millis(u64),
}

impl Timeout {
    /// `None` for [`Timeout::Infinite`].
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Timeout::Infinite => None,
            Timeout::Millis(ms) => Some(Duration::from_millis(*ms)),
        }
    }
}

/// The receive-timeout value as handed to transport construction: signed and
/// unvalidated on purpose. Construction interprets it permissively — any
/// non-positive value silently falls back to infinite instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimeout {
    Infinite,
    Millis(i64),
}

impl From<Timeout> for RawTimeout {
    fn from(t: Timeout) -> Self {
        match t {
            Timeout::Infinite => RawTimeout::Infinite,
            Timeout::Millis(ms) => RawTimeout::Millis(ms as i64),
        }
    }
}

/// Low-level socket options applied to the TCP socket after connect/accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockOpt {
    /// `TCP_NODELAY`. The factory enables it by default; listing
    /// `NoDelay(false)` turns it back off.
    NoDelay(bool),
    /// IP time-to-live.
    Ttl(u32),
}

/// TLS configuration options, consumed in one pass to build a rustls config.
///
/// Client side: `CaFile` (or `Insecure`) selects how the server certificate
/// is verified, `CertFile` + `KeyFile` enable mutual TLS, `ServerName`
/// overrides the SNI name derived from the connect host.
/// Accept side: `CertFile` + `KeyFile` are the server identity and `CaFile`,
/// when present, requires client certificates signed by that CA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsOpt {
    CaFile(PathBuf),
    CertFile(PathBuf),
    KeyFile(PathBuf),
    ServerName(String),
    /// Skip server certificate verification. Testing only.
    Insecure,
}

/// One entry in the factory's raw option list. Every variant lands in
/// exactly one of [`FactoryOptions`] or [`TransportOptions`].
#[derive(Debug, Clone)]
pub enum ConnOpt {
    /// Wrap connections in the framed decorator instead of the buffered one.
    Framed(bool),
    /// Extra socket options applied after the factory's base set.
    SockOpts(Vec<SockOpt>),
    /// Bound on TCP connect and the TLS handshake, per attempt.
    ConnectTimeout(Timeout),
    /// TLS configuration for the client handshake.
    TlsOptions(Vec<TlsOpt>),
    /// Receive timeout for the constructed transport.
    RecvTimeout(Timeout),
}

/// Options scoped to the factory itself, fixed once parsing succeeds.
#[derive(Debug, Clone)]
pub(crate) struct FactoryOptions {
    pub connect_timeout: Timeout,
    pub sock_opts:       Vec<SockOpt>,
    pub framed:          bool,
    pub tls_options:     Vec<TlsOpt>,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Timeout::Infinite,
            sock_opts:       Vec::new(),
            framed:          false,
            tls_options:     Vec::new(),
        }
    }
}

/// Options passed through to transport construction, not to the factory.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Receive timeout; absent means infinite.
    pub recv_timeout: Option<RawTimeout>,
}

impl TransportOptions {
    /// Resolve the receive timeout permissively: positive values are used,
    /// anything else (zero, negative, absent, explicit infinite) means no
    /// timeout. Construction never fails on a bad value.
    pub(crate) fn effective_recv_timeout(&self) -> Option<Duration> {
        match self.recv_timeout {
            Some(RawTimeout::Millis(ms)) if ms > 0 => Some(Duration::from_millis(ms as u64)),
            Some(RawTimeout::Millis(ms)) => {
                tracing::debug!(ms, "ignoring non-positive recv timeout, defaulting to infinite");
                None
            }
            Some(RawTimeout::Infinite) | None => None,
        }
    }
}

/// Partition the raw option list into its two destinations in a single
/// left-to-right pass. Each key overwrites its own field when seen; there is
/// no ordering dependency between distinct keys.
///
/// Validation here is strict: a non-positive timeout is a configuration
/// error, not something to paper over.
pub(crate) fn partition_options(
    opts: Vec<ConnOpt>,
) -> Result<(FactoryOptions, TransportOptions), ConnectError> {
    let mut factory = FactoryOptions::default();
    let mut transport = TransportOptions::default();

    for opt in opts {
        match opt {
            ConnOpt::Framed(framed) => factory.framed = framed,
            ConnOpt::SockOpts(sock_opts) => factory.sock_opts = sock_opts,
            ConnOpt::ConnectTimeout(t) => {
                factory.connect_timeout = require_positive("connect_timeout", t)?;
            }
            ConnOpt::TlsOptions(tls_options) => factory.tls_options = tls_options,
            ConnOpt::RecvTimeout(t) => {
                transport.recv_timeout = Some(require_positive("recv_timeout", t)?.into());
            }
        }
    }

    Ok((factory, transport))
}

fn require_positive(key: &str, t: Timeout) -> Result<Timeout, ConnectError> {
    match t {
        Timeout::Millis(0) => Err(ConnectError::Config(format!(
            "{key} must be a positive number of milliseconds"
        ))),
        other => Ok(other),
    }
}

/// Apply configured socket options on top of whatever the caller already set.
pub(crate) fn apply_sock_opts(sock: &TcpStream, opts: &[SockOpt]) -> io::Result<()> {
    for opt in opts {
        match opt {
            SockOpt::NoDelay(v) => sock.set_nodelay(*v)?,
            SockOpt::Ttl(v) => sock.set_ttl(*v)?,
        }
    }
    Ok(())
}
