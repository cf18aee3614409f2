//! Transport: how the client reaches a socket.
//!
//! The [`Connect`] trait is injected into the `Client` at construction, so
//! tests can substitute an in-memory stream and production code can pick
//! plain tcp or tls. There is no process-wide registration of any kind.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_io::{AsyncRead, AsyncWrite};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::Uri;

use crate::error::{Error, Result};

/// The socket coordinates a request connects to, derived from the request uri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketUri {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl SocketUri {
    pub(crate) fn from_uri(uri: &Uri) -> Result<Self> {
        let scheme = match uri.scheme_str() {
            Some("http") | None => Scheme::Http,
            Some("https") => Scheme::Https,
            Some(other) => {
                return Err(Error::Config(format!("unsupported scheme: {}", other)));
            }
        };
        let host = uri
            .host()
            .ok_or_else(|| Error::Config("request uri has no host".to_owned()))?;
        let port = uri.port_u16().unwrap_or(match scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        });
        Ok(Self {
            scheme,
            host: host.to_owned(),
            port,
        })
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == Scheme::Https
    }
}

impl fmt::Display for SocketUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens streams to socket uris.
///
/// The stream is everything the client needs from a transport: sized reads,
/// line reads (through a `BufReader`), writes, and close.
pub trait Connect {
    type Stream: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static;

    /// Whether `https` targets can be opened at all. Checked before any
    /// connection attempt is made.
    fn supports_tls(&self) -> bool;

    fn connect<'a>(&'a self, target: &'a SocketUri) -> BoxFuture<'a, io::Result<Self::Stream>>;
}

/// Tls settings applied when connecting to an `https` target.
///
/// Certificate configuration details beyond these knobs are out of scope;
/// the roots come from `webpki-roots`.
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// Verify the server certificate chain. Off means any certificate is
    /// accepted.
    pub verify_peer: bool,
    /// Accept self-signed certificates, skipping chain verification.
    pub allow_self_signed: bool,
    /// Alpn protocols to offer, in preference order.
    pub alpn_protocols: Vec<Vec<u8>>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify_peer: true,
            allow_self_signed: false,
            alpn_protocols: Vec::new(),
        }
    }
}

/// The production connector: plain tcp, and tls for `https` targets when the
/// `tls` feature is enabled.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    #[cfg_attr(not(feature = "tls"), allow(dead_code))]
    tls: TlsOptions,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tls_options(tls: TlsOptions) -> Self {
        Self { tls }
    }
}

impl Connect for TcpConnector {
    type Stream = Stream;

    fn supports_tls(&self) -> bool {
        cfg!(feature = "tls")
    }

    fn connect<'a>(&'a self, target: &'a SocketUri) -> BoxFuture<'a, io::Result<Stream>> {
        async move {
            let tcp = async_net::TcpStream::connect((target.host.as_str(), target.port)).await?;
            match target.scheme {
                Scheme::Http => Ok(Stream::Plain(tcp)),
                #[cfg(feature = "tls")]
                Scheme::Https => {
                    let tls = tls::handshake(tcp, &target.host, &self.tls).await?;
                    Ok(Stream::Tls(tls))
                }
                #[cfg(not(feature = "tls"))]
                Scheme::Https => Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "tls support is not compiled in",
                )),
            }
        }
        .boxed()
    }
}

/// Unified stream: plain tcp or tls.
pub enum Stream {
    Plain(async_net::TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<futures_rustls::client::TlsStream<async_net::TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            Stream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            Stream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            Stream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            Stream::Plain(s) => Pin::new(s).poll_close(cx),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_close(cx),
        }
    }
}

#[cfg(feature = "tls")]
mod tls {
    use std::convert::TryFrom;
    use std::io;
    use std::sync::Arc;

    use futures_rustls::client::TlsStream;
    use futures_rustls::rustls::pki_types::ServerName;
    use futures_rustls::rustls::{ClientConfig, RootCertStore};
    use futures_rustls::TlsConnector;

    use super::TlsOptions;

    pub(super) async fn handshake(
        tcp: async_net::TcpStream,
        host: &str,
        opts: &TlsOptions,
    ) -> io::Result<Box<TlsStream<async_net::TcpStream>>> {
        let builder = ClientConfig::builder();
        let mut config = if opts.verify_peer && !opts.allow_self_signed {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder
                .with_root_certificates(roots)
                .with_no_client_auth()
        } else {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(danger::NoVerify))
                .with_no_client_auth()
        };
        config.alpn_protocols = opts.alpn_protocols.clone();

        let name = ServerName::try_from(host.to_owned())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid server name"))?;
        let stream = TlsConnector::from(Arc::new(config)).connect(name, tcp).await?;
        Ok(Box::new(stream))
    }

    mod danger {
        use futures_rustls::rustls;
        use rustls::client::danger::{
            HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
        };
        use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
        use rustls::{DigitallySignedStruct, SignatureScheme};

        /// Accepts any server certificate. Only reachable when the caller
        /// turned peer verification off or allowed self-signed certs.
        #[derive(Debug)]
        pub(super) struct NoVerify;

        impl ServerCertVerifier for NoVerify {
            fn verify_server_cert(
                &self,
                _end_entity: &CertificateDer<'_>,
                _intermediates: &[CertificateDer<'_>],
                _server_name: &ServerName<'_>,
                _ocsp_response: &[u8],
                _now: UnixTime,
            ) -> Result<ServerCertVerified, rustls::Error> {
                Ok(ServerCertVerified::assertion())
            }

            fn verify_tls12_signature(
                &self,
                _message: &[u8],
                _cert: &CertificateDer<'_>,
                _dss: &DigitallySignedStruct,
            ) -> Result<HandshakeSignatureValid, rustls::Error> {
                Ok(HandshakeSignatureValid::assertion())
            }

            fn verify_tls13_signature(
                &self,
                _message: &[u8],
                _cert: &CertificateDer<'_>,
                _dss: &DigitallySignedStruct,
            ) -> Result<HandshakeSignatureValid, rustls::Error> {
                Ok(HandshakeSignatureValid::assertion())
            }

            fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
                vec![
                    SignatureScheme::RSA_PKCS1_SHA256,
                    SignatureScheme::ECDSA_NISTP256_SHA256,
                    SignatureScheme::RSA_PKCS1_SHA384,
                    SignatureScheme::ECDSA_NISTP384_SHA384,
                    SignatureScheme::RSA_PKCS1_SHA512,
                    SignatureScheme::ECDSA_NISTP521_SHA512,
                    SignatureScheme::RSA_PSS_SHA256,
                    SignatureScheme::RSA_PSS_SHA384,
                    SignatureScheme::RSA_PSS_SHA512,
                    SignatureScheme::ED25519,
                ]
            }
        }
    }
}
