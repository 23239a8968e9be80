//! End-to-end tests over real loopback sockets, with certificates minted at
//! test time so no fixture files are needed.

use std::{
    fs,
    net::{TcpListener, TcpStream},
    path::PathBuf,
    sync::mpsc,
    thread,
    time::Duration,
};

use anyhow::Result;
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use wirebound_core::{Transport, TransportError};
use wirebound_tls::{
    AcceptError, ConnOpt, ConnectError, Timeout, TlsConnector, TlsOpt, TlsTransport,
    TransportOptions,
};

/// CA + server identity written out as PEM files.
struct TestPki {
    ca_pem:   PathBuf,
    cert_pem: PathBuf,
    key_pem:  PathBuf,
}

impl TestPki {
    /// Mint a fresh CA and a "localhost" server certificate signed by it.
    fn mint(tag: &str) -> Result<Self> {
        let ca_key = KeyPair::generate()?;
        let mut ca_params = CertificateParams::new(Vec::new())?;
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key)?;

        let server_key = KeyPair::generate()?;
        let server_params =
            CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])?;
        let server_cert = server_params.signed_by(&server_key, &ca_cert, &ca_key)?;

        let dir = std::env::temp_dir().join(format!("wirebound-tls-{}-{}", tag, std::process::id()));
        fs::create_dir_all(&dir)?;

        let ca_pem = dir.join("root-ca.pem");
        let cert_pem = dir.join("server.pem");
        let key_pem = dir.join("server.key.pem");
        fs::write(&ca_pem, ca_cert.pem())?;
        fs::write(&cert_pem, server_cert.pem())?;
        fs::write(&key_pem, server_key.serialize_pem())?;

        Ok(Self {
            ca_pem,
            cert_pem,
            key_pem,
        })
    }

    fn server_opts(&self) -> Vec<TlsOpt> {
        vec![
            TlsOpt::CertFile(self.cert_pem.clone()),
            TlsOpt::KeyFile(self.key_pem.clone()),
        ]
    }
}

/// Accept one connection, upgrade it, and echo bytes back until the peer
/// goes away. `framed` must match the client's decorator choice.
fn spawn_echo_peer(pki: &TestPki, framed: bool) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let tls_opts = pki.server_opts();

    let handle = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        // A handshake rejection is fatal for this connection only; some
        // tests provoke exactly that.
        let Ok(transport) = TlsTransport::upgrade(sock, &[], &tls_opts, TransportOptions::default())
        else {
            return;
        };

        let mut transport: Box<dyn Transport> = if framed {
            Box::new(wirebound_core::FramedTransport::new(transport))
        } else {
            Box::new(wirebound_core::BufferedTransport::new(transport))
        };

        let mut buf = [0u8; 1024];
        loop {
            let n = match transport.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => n,
                Err(e) if e.is_disconnect() => return,
                Err(e) => panic!("echo peer read failed: {e}"),
            };
            transport.write(&buf[..n]).unwrap();
            transport.flush().unwrap();
        }
    });

    (port, handle)
}

/// Bind and immediately drop a listener to find a port nothing listens on.
fn unused_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn framed_connection_round_trips_exact_bytes() -> Result<()> {
    let pki = TestPki::mint("framed-rt")?;
    let (port, peer) = spawn_echo_peer(&pki, true);

    let connector = TlsConnector::new(
        "localhost",
        port,
        vec![
            ConnOpt::Framed(true),
            ConnOpt::RecvTimeout(Timeout::Millis(5000)),
            ConnOpt::TlsOptions(vec![TlsOpt::CaFile(pki.ca_pem.clone())]),
        ],
    )?;
    let mut transport = connector.connect()?;

    let payload = b"the quick brown fox jumps over the lazy dog";
    transport.write(payload)?;
    transport.flush()?;

    let mut echoed = vec![0u8; payload.len()];
    transport.read_exact(&mut echoed)?;
    assert_eq!(&echoed, payload);

    // Flush is a pure no-op at every layer: repeated calls succeed and the
    // connection stays usable.
    transport.flush()?;
    transport.flush()?;
    transport.write(b"again")?;
    transport.flush()?;
    let mut again = [0u8; 5];
    transport.read_exact(&mut again)?;
    assert_eq!(&again, b"again");

    transport.close()?;
    peer.join().unwrap();
    Ok(())
}

#[test]
fn buffered_connection_round_trips_exact_bytes() -> Result<()> {
    let pki = TestPki::mint("buffered-rt")?;
    let (port, peer) = spawn_echo_peer(&pki, false);

    // framed defaults to false: the buffered decorator is the outer layer.
    let connector = TlsConnector::new(
        "localhost",
        port,
        vec![
            ConnOpt::RecvTimeout(Timeout::Millis(5000)),
            ConnOpt::ConnectTimeout(Timeout::Millis(5000)),
            ConnOpt::TlsOptions(vec![TlsOpt::Insecure]),
        ],
    )?;
    let mut transport = connector.connect()?;

    let payload = b"buffered bytes, no delimiters";
    transport.write(payload)?;
    transport.flush()?;

    let mut echoed = vec![0u8; payload.len()];
    transport.read_exact(&mut echoed)?;
    assert_eq!(&echoed, payload);

    transport.close()?;
    peer.join().unwrap();
    Ok(())
}

#[test]
fn read_timeout_closes_the_transport() -> Result<()> {
    let pki = TestPki::mint("timeout")?;
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let tls_opts = pki.server_opts();

    // A peer that completes the handshake and then never replies.
    let mute_peer = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let transport =
            TlsTransport::upgrade(sock, &[], &tls_opts, TransportOptions::default()).unwrap();
        thread::sleep(Duration::from_secs(2));
        drop(transport);
    });

    let connector = TlsConnector::new(
        "localhost",
        port,
        vec![
            ConnOpt::RecvTimeout(Timeout::Millis(1)),
            ConnOpt::TlsOptions(vec![TlsOpt::Insecure]),
        ],
    )?;
    let mut transport = connector.connect()?;

    let err = transport.read_exact(&mut [0u8; 4]).unwrap_err();
    assert!(matches!(err, TransportError::Timeout { .. }), "got {err:?}");

    // The timeout closed the connection: the handle is unusable now.
    assert!(transport.read_exact(&mut [0u8; 4]).is_err());

    mute_peer.join().unwrap();
    Ok(())
}

#[test]
fn refused_connect_reports_connect_error() -> Result<()> {
    let connector = TlsConnector::new(
        "127.0.0.1",
        unused_port(),
        vec![
            ConnOpt::ConnectTimeout(Timeout::Millis(2000)),
            ConnOpt::TlsOptions(vec![TlsOpt::Insecure]),
        ],
    )?;

    // TCP connect fails, so no TLS handshake is ever attempted.
    let err = connector.connect().unwrap_err();
    assert!(matches!(err, ConnectError::Connect { .. }), "got {err:?}");
    Ok(())
}

#[test]
fn non_tls_peer_fails_the_handshake() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();

    let peer = thread::spawn(move || {
        use std::io::{Read, Write};
        let (mut sock, _) = listener.accept().unwrap();
        sock.write_all(b"220 definitely not a tls server\r\n").unwrap();
        let _ = sock.read(&mut [0u8; 256]);
    });

    let connector = TlsConnector::new(
        "127.0.0.1",
        port,
        vec![
            ConnOpt::ConnectTimeout(Timeout::Millis(2000)),
            ConnOpt::TlsOptions(vec![TlsOpt::Insecure]),
        ],
    )?;

    let err = connector.connect().unwrap_err();
    assert!(
        matches!(
            err,
            ConnectError::Handshake { .. } | ConnectError::Upgrade { .. }
        ),
        "got {err:?}"
    );

    peer.join().unwrap();
    Ok(())
}

#[test]
fn untrusted_server_certificate_is_rejected() -> Result<()> {
    let server_pki = TestPki::mint("mismatch-server")?;
    let client_pki = TestPki::mint("mismatch-client")?;
    let (port, _peer) = spawn_echo_peer(&server_pki, false);

    // The client trusts a different CA than the one that signed the
    // server's certificate.
    let connector = TlsConnector::new(
        "localhost",
        port,
        vec![ConnOpt::TlsOptions(vec![TlsOpt::CaFile(
            client_pki.ca_pem.clone(),
        )])],
    )?;

    let err = connector.connect().unwrap_err();
    assert!(matches!(err, ConnectError::Handshake { .. }), "got {err:?}");
    Ok(())
}

#[test]
fn accept_side_rejects_a_non_tls_client() -> Result<()> {
    let pki = TestPki::mint("accept-reject")?;
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let tls_opts = pki.server_opts();

    let (tx, rx) = mpsc::channel();
    let acceptor = thread::spawn(move || {
        let (sock, _) = listener.accept().unwrap();
        let outcome = TlsTransport::upgrade(sock, &[], &tls_opts, TransportOptions::default());
        tx.send(outcome.err()).unwrap();
    });

    {
        use std::io::Write;
        let mut sock = TcpStream::connect(("127.0.0.1", port))?;
        sock.write_all(b"GET / HTTP/1.1\r\n\r\n")?;
    }

    let err = rx.recv()?.expect("upgrade should have failed");
    assert!(
        matches!(err, AcceptError::Handshake(_) | AcceptError::HandshakeFailed),
        "got {err:?}"
    );

    acceptor.join().unwrap();
    Ok(())
}
