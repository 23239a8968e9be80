use std::{fs, net::TcpListener, thread};

use anyhow::{Context, Result};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use wirebound_core::{FramedTransport, Transport};
use wirebound_tls::{ConnOpt, Timeout, TlsConnector, TlsOpt, TlsTransport, TransportOptions};

/// Self-contained demo: an accept-side TLS peer and a connector talking to
/// it over loopback, with certificates minted on the fly.
fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("=== wirebound TLS transport echo example ===");

    println!("\n1. Minting a throwaway CA and server certificate...");
    let dir = std::env::temp_dir().join(format!("wirebound-echo-{}", std::process::id()));
    fs::create_dir_all(&dir)?;

    let ca_key = KeyPair::generate()?;
    let mut ca_params = CertificateParams::new(Vec::new())?;
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca_cert = ca_params.self_signed(&ca_key)?;

    let server_key = KeyPair::generate()?;
    let server_params = CertificateParams::new(vec!["localhost".to_string()])?;
    let server_cert = server_params.signed_by(&server_key, &ca_cert, &ca_key)?;

    let ca_pem = dir.join("root-ca.pem");
    let cert_pem = dir.join("server.pem");
    let key_pem = dir.join("server.key.pem");
    fs::write(&ca_pem, ca_cert.pem())?;
    fs::write(&cert_pem, server_cert.pem())?;
    fs::write(&key_pem, server_key.serialize_pem())?;
    println!("   Certificates written under {dir:?}");

    println!("\n2. Starting the accept-side echo peer...");
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let server_opts = vec![
        TlsOpt::CertFile(cert_pem.clone()),
        TlsOpt::KeyFile(key_pem.clone()),
    ];

    let peer = thread::spawn(move || -> Result<()> {
        let (sock, addr) = listener.accept()?;
        println!("   [peer] connection from {addr}, upgrading to TLS...");

        let transport = TlsTransport::upgrade(sock, &[], &server_opts, TransportOptions::default())
            .context("accept-side TLS upgrade failed")?;
        let mut transport = FramedTransport::new(transport);

        let mut buf = [0u8; 1024];
        loop {
            let n = match transport.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            transport.write(&buf[..n])?;
            transport.flush()?;
        }
        println!("   [peer] client disconnected");
        Ok(())
    });

    println!("\n3. Building the connector (framed, 5s receive timeout)...");
    let connector = TlsConnector::new(
        "localhost",
        port,
        vec![
            ConnOpt::Framed(true),
            ConnOpt::ConnectTimeout(Timeout::Millis(5000)),
            ConnOpt::RecvTimeout(Timeout::Millis(5000)),
            ConnOpt::TlsOptions(vec![TlsOpt::CaFile(ca_pem.clone())]),
        ],
    )?;

    let mut transport = connector.connect()?;
    println!("   ✓ Encrypted connection established on port {port}");

    println!("\n4. Round-tripping a message...");
    let payload = b"hello over TLS";
    transport.write(payload)?;
    transport.flush()?;

    let mut echoed = vec![0u8; payload.len()];
    transport.read_exact(&mut echoed)?;
    println!("   Sent:   {}", String::from_utf8_lossy(payload));
    println!("   Echoed: {}", String::from_utf8_lossy(&echoed));

    transport.close()?;
    peer.join().expect("peer thread panicked")?;

    println!("\n✓ Echo example completed successfully!");
    Ok(())
}
