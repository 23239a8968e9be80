//! Turns a [`TlsOpt`] list into a ready rustls configuration, client or
//! accept side. Certificate material is loaded from PEM files the same way
//! on both sides.

use std::{fs, io::BufReader, path::Path, sync::Arc};

use rustls::{
    pki_types::{CertificateDer, PrivateKeyDer, ServerName},
    server::WebPkiClientVerifier,
    ClientConfig, RootCertStore, ServerConfig,
};
use rustls_pemfile::{certs, private_key};

use crate::{
    error::{AcceptError, ConnectError},
    insecure::InsecureServerVerifier,
    options::TlsOpt,
};

/// Everything the connector needs per handshake, built once per factory.
pub(crate) struct ClientTlsSetup {
    pub config:      Arc<ClientConfig>,
    pub server_name: ServerName<'static>,
}

/// Build the client-side rustls configuration from a TLS option list.
///
/// Server certificate verification requires either a `CaFile` or the
/// explicit `Insecure` opt-out; `CertFile` + `KeyFile` together enable
/// mutual TLS. The SNI name defaults to the connect host unless a
/// `ServerName` entry overrides it.
pub(crate) fn build_client_config(
    opts: &[TlsOpt],
    host: &str,
) -> Result<ClientTlsSetup, ConnectError> {
    let mut ca = None;
    let mut cert = None;
    let mut key = None;
    let mut sni = None;
    let mut insecure = false;

    for opt in opts {
        match opt {
            TlsOpt::CaFile(path) => ca = Some(path.clone()),
            TlsOpt::CertFile(path) => cert = Some(path.clone()),
            TlsOpt::KeyFile(path) => key = Some(path.clone()),
            TlsOpt::ServerName(name) => sni = Some(name.clone()),
            TlsOpt::Insecure => insecure = true,
        }
    }

    // Install the default crypto provider for rustls if not already installed.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let builder = ClientConfig::builder();
    let builder = if insecure {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(InsecureServerVerifier))
    } else {
        let ca_path = ca.ok_or_else(|| {
            ConnectError::Config(
                "ssloptions must carry a CaFile (or the explicit Insecure opt-out)".to_string(),
            )
        })?;
        builder.with_root_certificates(load_roots(&ca_path).map_err(ConnectError::Config)?)
    };

    let config = match (cert, key) {
        (Some(cert_path), Some(key_path)) => {
            let chain = load_certs(&cert_path).map_err(ConnectError::Config)?;
            let private_key = load_key(&key_path).map_err(ConnectError::Config)?;
            builder
                .with_client_auth_cert(chain, private_key)
                .map_err(|e| {
                    ConnectError::Config(format!("failed to build TLS client configuration: {e}"))
                })?
        }
        (None, None) => builder.with_no_client_auth(),
        _ => {
            return Err(ConnectError::Config(
                "client authentication needs both CertFile and KeyFile".to_string(),
            ))
        }
    };

    let name = sni.unwrap_or_else(|| host.to_string());
    let server_name = ServerName::try_from(name.clone())
        .map_err(|_| ConnectError::Config(format!("invalid server name: {name}")))?;

    Ok(ClientTlsSetup {
        config: Arc::new(config),
        server_name,
    })
}

/// Build the accept-side rustls configuration from a TLS option list.
///
/// `CertFile` + `KeyFile` are the server identity and are required. A
/// `CaFile`, when present, requires clients to present a certificate signed
/// by that CA. Client-only entries are rejected rather than ignored.
pub(crate) fn build_server_config(opts: &[TlsOpt]) -> Result<Arc<ServerConfig>, AcceptError> {
    let mut ca = None;
    let mut cert = None;
    let mut key = None;

    for opt in opts {
        match opt {
            TlsOpt::CaFile(path) => ca = Some(path.clone()),
            TlsOpt::CertFile(path) => cert = Some(path.clone()),
            TlsOpt::KeyFile(path) => key = Some(path.clone()),
            TlsOpt::ServerName(_) | TlsOpt::Insecure => {
                return Err(AcceptError::Config(format!(
                    "{opt:?} is not an accept-side TLS option"
                )))
            }
        }
    }

    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert_path = cert
        .ok_or_else(|| AcceptError::Config("accept-side TLS options need a CertFile".to_string()))?;
    let key_path = key
        .ok_or_else(|| AcceptError::Config("accept-side TLS options need a KeyFile".to_string()))?;

    let chain = load_certs(&cert_path).map_err(AcceptError::Config)?;
    let private_key = load_key(&key_path).map_err(AcceptError::Config)?;

    let builder = match ca {
        Some(ca_path) => {
            let roots = load_roots(&ca_path).map_err(AcceptError::Config)?;
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|e| {
                    AcceptError::Config(format!("failed to build client verifier: {e}"))
                })?;
            ServerConfig::builder().with_client_cert_verifier(verifier)
        }
        None => ServerConfig::builder().with_no_client_auth(),
    };

    let config = builder.with_single_cert(chain, private_key).map_err(|e| {
        AcceptError::Config(format!("failed to build TLS server configuration: {e}"))
    })?;

    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, String> {
    let pem =
        fs::read(path).map_err(|e| format!("failed to read certificate file {path:?}: {e}"))?;
    certs(&mut BufReader::new(&*pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("failed to parse certificate PEM data in {path:?}: {e}"))
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, String> {
    let pem =
        fs::read(path).map_err(|e| format!("failed to read private key file {path:?}: {e}"))?;
    private_key(&mut BufReader::new(&*pem))
        .map_err(|e| format!("failed to parse private key PEM data in {path:?}: {e}"))?
        .ok_or_else(|| format!("no private key found in {path:?}"))
}

fn load_roots(path: &Path) -> Result<RootCertStore, String> {
    let mut roots = RootCertStore::empty();
    roots.add_parsable_certificates(load_certs(path)?);
    if roots.is_empty() {
        return Err(format!("no valid CA certificates found in {path:?}"));
    }
    Ok(roots)
}
