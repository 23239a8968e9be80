use std::{
    io::{self, Read, Write},
    net::TcpStream,
    time::Duration,
};

use rustls::ServerConnection;
use wirebound_core::{Transport, TransportError};

use crate::{
    config::build_server_config,
    error::AcceptError,
    options::{apply_sock_opts, SockOpt, TlsOpt, TransportOptions},
    stream::{HandshakeError, TlsStream},
};

/// Byte-stream transport over one established TLS connection.
///
/// Exactly one logical owner at a time; operations are sequential. All I/O
/// is blocking. A read that exceeds the configured receive timeout closes
/// the connection as a side effect — the transport is considered unusable
/// after a timed-out read, and later operations fail from the socket layer.
#[derive(Debug)]
pub struct TlsTransport {
    stream:       TlsStream,
    recv_timeout: Option<Duration>,
}

impl TlsTransport {
    /// Accept-side upgrade: take an inbound TCP socket that is about to
    /// speak TLS, perform the server handshake, and return the transport.
    ///
    /// The socket is forced into blocking delivery with no read timeout
    /// before the handshake so no handshake bytes are lost to a stale
    /// non-blocking mode, then `sock_opts` are applied. An explicit TLS
    /// rejection comes back as [`AcceptError::Handshake`]; any other
    /// outcome is logged and reported as the generic
    /// [`AcceptError::HandshakeFailed`]. Both are fatal for this
    /// connection's handler only.
    pub fn upgrade(
        tcp: TcpStream,
        sock_opts: &[SockOpt],
        tls_options: &[TlsOpt],
        options: TransportOptions,
    ) -> Result<Self, AcceptError> {
        let peer = tcp
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());

        if let Err(e) = prepare_accept_socket(&tcp, sock_opts) {
            tracing::error!(%peer, error = %e, "failed to prepare socket for TLS accept");
            return Err(AcceptError::HandshakeFailed);
        }

        let config = build_server_config(tls_options)?;
        let conn = ServerConnection::new(config).map_err(AcceptError::Handshake)?;

        let mut stream = TlsStream::server(tcp, conn);
        match stream.handshake() {
            Ok(()) => {
                tracing::debug!(%peer, "TLS accept handshake complete");
                Ok(Self::new(stream, options))
            }
            Err(HandshakeError::Tls(e)) => {
                let _ = stream.shutdown();
                Err(AcceptError::Handshake(e))
            }
            Err(HandshakeError::Io(e)) => {
                tracing::error!(%peer, error = %e, "unexpected outcome during TLS accept handshake");
                let _ = stream.shutdown();
                Err(AcceptError::HandshakeFailed)
            }
        }
    }

    /// Construct the transport from an already-upgraded stream.
    ///
    /// The receive timeout is resolved permissively: a positive value is
    /// stored, anything else falls back to infinite. Construction itself
    /// never fails.
    pub(crate) fn new(stream: TlsStream, options: TransportOptions) -> Self {
        let recv_timeout = options.effective_recv_timeout();
        if let Err(e) = stream.set_read_timeout(recv_timeout) {
            tracing::warn!(
                peer = stream.peer(),
                error = %e,
                "failed to apply receive timeout, reads will block indefinitely"
            );
        }
        Self {
            stream,
            recv_timeout,
        }
    }

    /// Peer identity, for diagnostics.
    pub fn peer(&self) -> &str {
        self.stream.peer()
    }

    fn is_timeout(e: &io::Error) -> bool {
        matches!(
            e.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        )
    }
}

fn prepare_accept_socket(tcp: &TcpStream, sock_opts: &[SockOpt]) -> io::Result<()> {
    // Blocking delivery, no timeout: handshake records must not be lost to
    // a stale non-blocking mode, and the accept handshake has no bound.
    tcp.set_nonblocking(false)?;
    tcp.set_read_timeout(None)?;
    apply_sock_opts(tcp, sock_opts)
}

impl Transport for TlsTransport {
    fn read(&mut self, buf: &mut [u8]) -> wirebound_core::Result<usize> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if Self::is_timeout(&e) => {
                let peer = self.stream.peer().to_string();
                tracing::warn!(
                    %peer,
                    timeout = ?self.recv_timeout,
                    "read timed out, closing connection"
                );
                // A half-dead connection must not be reused; close it before
                // surfacing the timeout.
                let _ = self.stream.shutdown();
                Err(TransportError::Timeout { peer })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, buf: &[u8]) -> wirebound_core::Result<()> {
        self.stream.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> wirebound_core::Result<()> {
        // Every write is fully transmitted synchronously; nothing to push.
        Ok(())
    }

    fn close(&mut self) -> wirebound_core::Result<()> {
        self.stream.close()?;
        Ok(())
    }
}
