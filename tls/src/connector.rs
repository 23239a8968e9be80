use std::{
    io,
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use rustls::{pki_types::ServerName, ClientConfig, ClientConnection};
use wirebound_core::{BufferedTransport, FramedTransport, Transport};

use crate::{
    config::build_client_config,
    error::ConnectError,
    options::{apply_sock_opts, partition_options, ConnOpt, SockOpt, TransportOptions},
    stream::{HandshakeError, TlsStream},
};

/// Client-side connection factory.
///
/// Built once from `(host, port, options)`: the option list is partitioned
/// and validated at construction time and the rustls client configuration is
/// derived from it exactly once. The factory itself holds no mutable state;
/// every [`connect`](Self::connect) call runs the full establishment
/// sequence from scratch on its own socket, so calls may run concurrently
/// without coordination.
pub struct TlsConnector {
    host:              String,
    port:              u16,
    connect_timeout:   Option<Duration>,
    sock_opts:         Vec<SockOpt>,
    framed:            bool,
    tls_config:        Arc<ClientConfig>,
    server_name:       ServerName<'static>,
    transport_options: TransportOptions,
}

impl TlsConnector {
    /// Parse the option list and build the factory.
    ///
    /// Validation is strict: a malformed option value is an error here, at
    /// the call site that supplied it, not later during a connect attempt.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        opts: Vec<ConnOpt>,
    ) -> Result<Self, ConnectError> {
        let host = host.into();
        let (factory, transport_options) = partition_options(opts)?;
        let setup = build_client_config(&factory.tls_options, &host)?;

        Ok(Self {
            host,
            port,
            connect_timeout: factory.connect_timeout.duration(),
            sock_opts: factory.sock_opts,
            framed: factory.framed,
            tls_config: setup.config,
            server_name: setup.server_name,
            transport_options,
        })
    }

    /// Establish one outbound connection: TCP connect, TLS handshake,
    /// transport construction, decorator wrapping. Each step's failure
    /// short-circuits the rest, and a socket opened by a failed attempt is
    /// closed before the error propagates.
    pub fn connect(&self) -> Result<Box<dyn Transport>, ConnectError> {
        let tcp = self.open_tcp()?;
        let stream = self.tls_handshake(tcp)?;
        let transport = crate::TlsTransport::new(stream, self.transport_options.clone());

        // Exactly one outer decorator, chosen by the framed flag.
        Ok(if self.framed {
            Box::new(FramedTransport::new(transport))
        } else {
            Box::new(BufferedTransport::new(transport))
        })
    }

    fn addr_display(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open_tcp(&self) -> Result<TcpStream, ConnectError> {
        let addr = self.addr_display();
        let connect_err = |source| ConnectError::Connect {
            addr: addr.clone(),
            source,
        };

        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(connect_err)?;

        let mut last_err = None;
        for candidate in addrs {
            let attempt = match self.connect_timeout {
                Some(bound) => TcpStream::connect_timeout(&candidate, bound),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(sock) => {
                    // Base socket options: low-latency delivery on by
                    // default, then whatever the caller configured.
                    sock.set_nodelay(true).map_err(connect_err)?;
                    apply_sock_opts(&sock, &self.sock_opts).map_err(connect_err)?;
                    tracing::debug!(%addr, "TCP connection established");
                    return Ok(sock);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(connect_err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
        })))
    }

    fn tls_handshake(&self, tcp: TcpStream) -> Result<TlsStream, ConnectError> {
        let addr = self.addr_display();

        // Bound each handshake step by the connect timeout; cleared once the
        // handshake completes (the receive timeout is applied at transport
        // construction).
        if let Err(e) = tcp.set_read_timeout(self.connect_timeout) {
            let _ = tcp.shutdown(Shutdown::Both);
            return Err(ConnectError::Upgrade { addr, source: e });
        }

        let conn = match ClientConnection::new(self.tls_config.clone(), self.server_name.clone()) {
            Ok(conn) => conn,
            Err(e) => {
                let _ = tcp.shutdown(Shutdown::Both);
                return Err(ConnectError::Handshake { addr, source: e });
            }
        };

        let mut stream = TlsStream::client(tcp, conn);
        match stream.handshake() {
            Ok(()) => {}
            Err(HandshakeError::Tls(e)) => {
                // The raw socket must never leak on a failed upgrade.
                let _ = stream.shutdown();
                return Err(ConnectError::Handshake { addr, source: e });
            }
            Err(HandshakeError::Io(e)) => {
                let _ = stream.shutdown();
                return Err(ConnectError::Upgrade { addr, source: e });
            }
        }

        if let Err(e) = stream.set_read_timeout(None) {
            let _ = stream.shutdown();
            return Err(ConnectError::Upgrade { addr, source: e });
        }

        tracing::debug!(%addr, "TLS handshake complete");
        Ok(stream)
    }
}
