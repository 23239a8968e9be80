use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

use rustls::{ClientConnection, Connection, ServerConnection};

/// How a handshake attempt failed: with an explicit TLS-level reason, or
/// with an I/O outcome the TLS layer never got to classify. The two are
/// reported differently up the chain.
#[derive(Debug)]
pub(crate) enum HandshakeError {
    Tls(rustls::Error),
    Io(io::Error),
}

/// Synchronous TLS session over a blocking TCP socket.
///
/// Owns both the socket and the rustls connection state and drives the
/// record layer inline: writes are fully transmitted before returning, reads
/// pull and decrypt records on demand. The peer address is captured up
/// front so it stays available for diagnostics after the socket dies.
#[derive(Debug)]
pub(crate) struct TlsStream {
    sock: TcpStream,
    tls:  Connection,
    peer: String,
}

impl TlsStream {
    pub fn client(sock: TcpStream, tls: ClientConnection) -> Self {
        Self::new(sock, Connection::Client(tls))
    }

    pub fn server(sock: TcpStream, tls: ServerConnection) -> Self {
        Self::new(sock, Connection::Server(tls))
    }

    fn new(sock: TcpStream, tls: Connection) -> Self {
        let peer = sock
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        Self { sock, tls, peer }
    }

    /// Drive the handshake to completion over the blocking socket. The
    /// socket's current read timeout bounds each step; a timeout surfaces
    /// as `HandshakeError::Io` with a `WouldBlock`/`TimedOut` kind.
    pub fn handshake(&mut self) -> Result<(), HandshakeError> {
        while self.tls.is_handshaking() {
            while self.tls.wants_write() {
                self.tls.write_tls(&mut self.sock).map_err(HandshakeError::Io)?;
            }
            if self.tls.is_handshaking() && self.tls.wants_read() {
                let n = self.tls.read_tls(&mut self.sock).map_err(HandshakeError::Io)?;
                if n == 0 {
                    return Err(HandshakeError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed during TLS handshake",
                    )));
                }
                self.tls
                    .process_new_packets()
                    .map_err(HandshakeError::Tls)?;
            }
        }
        // Drain anything queued by the final handshake step.
        while self.tls.wants_write() {
            self.tls.write_tls(&mut self.sock).map_err(HandshakeError::Io)?;
        }
        Ok(())
    }

    /// Peer identity for logging.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.sock.set_read_timeout(timeout)
    }

    /// Tear down the connection: queue a close_notify, push out whatever we
    /// can, then shut the socket down both ways. Any in-flight blocking
    /// operation in another context fails once this runs.
    pub fn close(&mut self) -> io::Result<()> {
        self.tls.send_close_notify();
        while self.tls.wants_write() {
            if self.tls.write_tls(&mut self.sock).is_err() {
                break;
            }
        }
        self.sock.shutdown(Shutdown::Both)
    }

    /// Shut the socket down without the TLS goodbye. Used when the
    /// connection is already considered dead (read timeout, failed upgrade).
    pub fn shutdown(&self) -> io::Result<()> {
        self.sock.shutdown(Shutdown::Both)
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            // Serve buffered plaintext first.
            match self.tls.reader().read(buf) {
                Ok(n) => return Ok(n),
                // No decrypted bytes available yet; pull more records.
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e),
            }

            if self.tls.read_tls(&mut self.sock)? == 0 {
                return Ok(0); // clean shutdown
            }
            self.tls
                .process_new_packets()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.tls.writer().write(buf)?;

        // Transmit synchronously: every byte accepted by the TLS session is
        // on the wire before this returns.
        while self.tls.wants_write() {
            self.tls.write_tls(&mut self.sock)?;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tls.writer().flush()?;
        while self.tls.wants_write() {
            self.tls.write_tls(&mut self.sock)?;
        }
        Ok(())
    }
}
