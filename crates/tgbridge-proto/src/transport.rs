//! TCP/TLS client transport with line framing.
//!
//! Owns the raw socket: resolution (with an IPv6 preference flag), TCP
//! keepalive, optional TLS (with certificate validation optionally
//! disabled), and splitting into framed read/write halves. The write half is
//! designed to be parked behind a single mutex by the caller; the read half
//! is driven by exactly one receive loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls;
use tokio_rustls::TlsConnector;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::codec::LineCodec;
use crate::error::ProtocolError;
use crate::line::Line;

/// TLS behavior for a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain TCP.
    Off,
    /// TLS with certificate validation against the system trust store.
    Verified,
    /// TLS without certificate validation. Only for servers with broken or
    /// self-signed certificates, and only when configured explicitly.
    Insecure,
}

/// Parameters for establishing a connection.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// TLS behavior.
    pub tls: TlsMode,
    /// Prefer AAAA results during resolution. When unset only A results are
    /// considered.
    pub prefer_ipv6: bool,
    /// OS-level TCP keepalive probe interval.
    pub keepalive_interval: Duration,
}

/// An established connection, before splitting.
pub enum Transport {
    /// Plain TCP.
    Tcp(TcpStream),
    /// Client-side TLS (boxed for size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport {
    /// Resolve, connect, enable keepalive, and optionally negotiate TLS.
    pub async fn connect(config: &TransportConfig) -> Result<Self, ProtocolError> {
        let addr = resolve(&config.host, config.port, config.prefer_ipv6).await?;
        debug!(host = %config.host, %addr, "connecting");
        let stream = TcpStream::connect(addr)
            .await
            .map_err(ProtocolError::Connect)?;

        if let Err(e) = enable_keepalive(&stream, config.keepalive_interval) {
            warn!(error = %e, "failed to enable TCP keepalive");
        }

        match config.tls {
            TlsMode::Off => Ok(Self::Tcp(stream)),
            mode => {
                let tls_config = if mode == TlsMode::Insecure {
                    debug!("TLS certificate validation disabled");
                    insecure_client_config()
                } else {
                    verified_client_config()
                };
                let connector = TlsConnector::from(Arc::new(tls_config));
                let server_name = rustls::pki_types::ServerName::try_from(config.host.clone())
                    .map_err(|_| ProtocolError::InvalidServerName(config.host.clone()))?;
                let stream = connector
                    .connect(server_name, stream)
                    .await
                    .map_err(ProtocolError::Connect)?;
                Ok(Self::Tls(Box::new(stream)))
            }
        }
    }

    /// Split into framed read and write halves.
    pub fn split(self) -> (TransportReader, TransportWriter) {
        match self {
            Self::Tcp(stream) => {
                let (read, write) = tokio::io::split(stream);
                (
                    TransportReader::Tcp(FramedRead::new(read, LineCodec::new())),
                    TransportWriter::Tcp(FramedWrite::new(write, LineCodec::new())),
                )
            }
            Self::Tls(stream) => {
                let (read, write) = tokio::io::split(*stream);
                (
                    TransportReader::Tls(FramedRead::new(read, LineCodec::new())),
                    TransportWriter::Tls(FramedWrite::new(write, LineCodec::new())),
                )
            }
        }
    }
}

/// The read half of a split transport.
pub enum TransportReader {
    /// Plain TCP read half.
    Tcp(FramedRead<ReadHalf<TcpStream>, LineCodec>),
    /// TLS read half.
    Tls(FramedRead<ReadHalf<TlsStream<TcpStream>>, LineCodec>),
}

impl TransportReader {
    /// Read the next line, suspending until data is available.
    ///
    /// `Ok(None)` means the peer closed the connection; errors are disconnect
    /// triggers for the caller.
    pub async fn read_line(&mut self) -> Result<Option<Line>, ProtocolError> {
        let next = match self {
            Self::Tcp(framed) => framed.next().await,
            Self::Tls(framed) => framed.next().await,
        };
        match next {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// The write half of a split transport.
pub enum TransportWriter {
    /// Plain TCP write half.
    Tcp(FramedWrite<WriteHalf<TcpStream>, LineCodec>),
    /// TLS write half.
    Tls(FramedWrite<WriteHalf<TlsStream<TcpStream>>, LineCodec>),
}

impl TransportWriter {
    /// Serialize and write one line.
    ///
    /// Fails with [`ProtocolError::LineTooLong`] before anything is written
    /// when the serialized line exceeds the wire limit; I/O failures are
    /// disconnect triggers for the caller.
    pub async fn write_line(&mut self, line: Line) -> Result<(), ProtocolError> {
        match self {
            Self::Tcp(framed) => framed.send(line).await,
            Self::Tls(framed) => framed.send(line).await,
        }
    }
}

async fn resolve(host: &str, port: u16, prefer_ipv6: bool) -> Result<SocketAddr, ProtocolError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(ProtocolError::Connect)?
        .collect();

    pick_address(&addrs, prefer_ipv6).ok_or_else(|| {
        ProtocolError::Connect(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no usable address for {host}"),
        ))
    })
}

/// Pick an address honoring the IPv6 preference: prefer AAAA when flagged
/// (falling back to anything), otherwise restrict to A results.
fn pick_address(addrs: &[SocketAddr], prefer_ipv6: bool) -> Option<SocketAddr> {
    if prefer_ipv6 {
        addrs
            .iter()
            .find(|a| a.is_ipv6())
            .or_else(|| addrs.first())
            .copied()
    } else {
        addrs.iter().find(|a| a.is_ipv4()).copied()
    }
}

fn enable_keepalive(stream: &TcpStream, interval: Duration) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(interval);
    sock.set_tcp_keepalive(&keepalive)
}

fn verified_client_config() -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for error in native.errors {
        warn!(error = %error, "skipping unreadable system root certificate");
    }
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "rejected system root certificate");
        }
    }
    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth()
}

fn insecure_client_config() -> rustls::ClientConfig {
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureVerifier))
        .with_no_client_auth()
}

/// Accepts any certificate. Only reachable through [`TlsMode::Insecure`].
#[derive(Debug)]
struct InsecureVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    fn v4(last: u8) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, last)), 6667)
    }

    fn v6() -> SocketAddr {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 6667)
    }

    #[test]
    fn test_prefers_ipv6_when_flagged() {
        let addrs = [v4(1), v6()];
        assert_eq!(pick_address(&addrs, true), Some(v6()));
    }

    #[test]
    fn test_falls_back_to_ipv4_when_no_ipv6() {
        let addrs = [v4(1), v4(2)];
        assert_eq!(pick_address(&addrs, true), Some(v4(1)));
    }

    #[test]
    fn test_ipv4_only_when_not_flagged() {
        let addrs = [v6(), v4(1)];
        assert_eq!(pick_address(&addrs, false), Some(v4(1)));
        assert_eq!(pick_address(&[v6()], false), None);
    }
}
