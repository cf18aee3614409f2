//! Simple client for HTTP/1.1
//!
//! One `request` call is one connection: normalize the request, connect,
//! write, read the head, read the body, then decide whether to close and
//! whether to follow a redirect. Nothing overlaps within a request.

mod decode;
mod encode;

use std::io;
use std::time::Duration;

use futures_util::io::{AsyncWriteExt, BufReader};
use http::header::{HeaderMap, CONNECTION, CONTENT_LENGTH, LOCATION, TRANSFER_ENCODING};
use http::request::Parts;
use http::{Method, StatusCode, Uri, Version};

use crate::body::Body;
use crate::connect::{Connect, SocketUri, TcpConnector};
use crate::encoding::{ContentDecode, FlateDecode};
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use crate::timeout::timeout;

/// Client identifier sent as `user-agent` on every request.
pub const USER_AGENT: &str = concat!("bowler/", env!("CARGO_PKG_VERSION"));

const DEFAULT_MAX_REDIRECTS: u32 = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP/1.1 client.
///
/// Holds only configuration, all of it read-only once requests start; the
/// per-request state lives on the `request` call. A client can be reused for
/// sequential requests, each over a fresh connection.
pub struct Client<C = TcpConnector> {
    connector: C,
    decoder: Box<dyn ContentDecode + Send + Sync>,
    accept_encoding: String,
    max_redirects: u32,
    timeout: Option<Duration>,
    proxy_style: bool,
    allow_nonstandard_redirects: bool,
}

impl Client<TcpConnector> {
    pub fn new() -> Self {
        Self::with_connector(TcpConnector::new())
    }
}

impl Default for Client<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connect> Client<C> {
    /// Build a client around an injected transport. Tests pass an in-memory
    /// connector here; `Client::new` wires up the tcp one.
    pub fn with_connector(connector: C) -> Self {
        let decoder = FlateDecode;
        let accept_encoding = decoder.encodings().join(", ");
        Self {
            connector,
            decoder: Box::new(decoder),
            accept_encoding,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: Some(DEFAULT_TIMEOUT),
            proxy_style: false,
            allow_nonstandard_redirects: false,
        }
    }

    /// Swap the content-encoding decoders. Also recomputes what the client
    /// advertises in `accept-encoding`.
    pub fn decoder(mut self, decoder: impl ContentDecode + Send + Sync + 'static) -> Self {
        self.accept_encoding = decoder.encodings().join(", ");
        self.decoder = Box::new(decoder);
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Deadline applied to each phase of a request: connect, write, read.
    /// `None` waits forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Emit absolute-uri request lines (and no `host` header), the way a
    /// proxy expects them.
    pub fn proxy_style(mut self, on: bool) -> Self {
        self.proxy_style = on;
        self
    }

    /// Also follow 3xx codes outside 301/302/303/307/308, as long as they
    /// carry a `location` header.
    pub fn allow_nonstandard_redirects(mut self, on: bool) -> Self {
        self.allow_nonstandard_redirects = on;
        self
    }

    /// The comma-joined encoding list sent as `accept-encoding`.
    pub fn accepted_encodings(&self) -> &str {
        &self.accept_encoding
    }

    /// Issue a request and read the full response.
    ///
    /// Follows redirects up to the configured maximum. The response body comes
    /// back de-chunked and decompressed.
    pub async fn request(&self, req: Request) -> Result<Response> {
        let (mut parts, mut body) = encode::normalize(req, USER_AGENT, &self.accept_encoding)?;
        let streamed = body.is_stream();
        let mut redirects = 0u32;

        loop {
            let target = SocketUri::from_uri(&parts.uri)?;
            if target.is_tls() && !self.connector.supports_tls() {
                return Err(Error::Config(
                    "https requested but connector has no tls support".to_owned(),
                ));
            }

            let mut stream = self.open(&target).await?;
            match self.exchange(&mut stream, &parts, &mut body).await {
                Ok(res) => {
                    if should_close(&parts.headers, &res) {
                        let _ = stream.close().await;
                    }
                    let hop = match self.next_hop(&parts, &res, streamed)? {
                        Some(hop) => hop,
                        None => return Ok(res),
                    };
                    redirects += 1;
                    if redirects > self.max_redirects {
                        return Err(Error::RedirectLimit(self.max_redirects));
                    }
                    log::debug!("following redirect {} -> {}", res.status(), hop.uri);
                    if hop.drop_body {
                        parts.headers.remove(CONTENT_LENGTH);
                        parts.headers.remove(TRANSFER_ENCODING);
                        body = Body::empty();
                    }
                    parts.method = hop.method;
                    parts.uri = hop.uri;
                }
                Err(err) => {
                    // Release the socket before surfacing the failure.
                    let _ = stream.close().await;
                    return Err(err);
                }
            }
        }
    }

    async fn open(&self, target: &SocketUri) -> Result<C::Stream> {
        let connect = self.connector.connect(target);
        let opened = match self.timeout {
            Some(dur) => match timeout(dur, connect).await {
                Ok(opened) => opened,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
            },
            None => connect.await,
        };
        opened.map_err(Error::Connect)
    }

    async fn exchange(
        &self,
        stream: &mut C::Stream,
        parts: &Parts,
        body: &mut Body,
    ) -> Result<Response> {
        let head = encode::build_head(parts, self.proxy_style)?;

        let write = encode::write_request(stream, &head, body);
        match self.timeout {
            Some(dur) => match timeout(dur, write).await {
                Ok(written) => written?,
                Err(_) => {
                    return Err(Error::Transfer(
                        "writing request",
                        io::Error::new(io::ErrorKind::TimedOut, "write timed out"),
                    ));
                }
            },
            None => write.await?,
        }

        let read = async {
            let mut reader = BufReader::new(&mut *stream);
            let mut res = decode::decode_head(&mut reader).await?;
            if decode::body_allowed(res.status()) {
                decode::read_body(&mut reader, &mut res, self.decoder.as_ref()).await?;
            }
            Ok(res)
        };
        match self.timeout {
            Some(dur) => match timeout(dur, read).await {
                Ok(response) => response,
                Err(_) => Err(Error::Transfer(
                    "reading response",
                    io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
                )),
            },
            None => read.await,
        }
    }

    /// Decide whether the response redirects us somewhere, and where.
    ///
    /// 301/302/303/307/308 are always eligible; any other 3xx with a
    /// `location` header only when non-standard redirects were allowed. A
    /// consumed streaming body cannot be replayed, so those requests hand the
    /// redirect response back to the caller instead (except 303, which
    /// rewrites to a bodiless GET anyway).
    fn next_hop(&self, parts: &Parts, res: &Response, streamed: bool) -> Result<Option<Hop>> {
        let status = res.status();
        if !status.is_redirection() {
            return Ok(None);
        }
        let location = match res.headers().get(LOCATION) {
            Some(location) => location,
            None => return Ok(None),
        };
        let standard = matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308);
        if !standard && !self.allow_nonstandard_redirects {
            return Ok(None);
        }

        let location = location
            .to_str()
            .map_err(|_| Error::MessageParse("location header is not ascii".to_owned()))?;
        let uri = resolve_location(&parts.uri, location)?;

        let (method, drop_body) = if status == StatusCode::SEE_OTHER {
            if parts.method == Method::GET || parts.method == Method::HEAD {
                (parts.method.clone(), true)
            } else {
                (Method::GET, true)
            }
        } else {
            (parts.method.clone(), false)
        };
        if streamed && !drop_body {
            return Ok(None);
        }

        Ok(Some(Hop {
            uri,
            method,
            drop_body,
        }))
    }
}

struct Hop {
    uri: Uri,
    method: Method,
    drop_body: bool,
}

/// Resolve a `location` value against the uri that produced it.
fn resolve_location(base: &Uri, location: &str) -> Result<Uri> {
    if location.starts_with('/') {
        let mut builder = Uri::builder();
        if let Some(scheme) = base.scheme_str() {
            builder = builder.scheme(scheme);
        }
        if let Some(authority) = base.authority() {
            builder = builder.authority(authority.as_str());
        }
        builder
            .path_and_query(location)
            .build()
            .map_err(|_| Error::MessageParse(format!("invalid location header: {}", location)))
    } else {
        location
            .parse::<Uri>()
            .ok()
            .filter(|uri| uri.scheme().is_some())
            .ok_or_else(|| Error::MessageParse(format!("invalid location header: {}", location)))
    }
}

/// Whether the exchange must end with an explicit connection close, from the
/// `connection` headers on either side and the response protocol version.
fn should_close(req_headers: &HeaderMap, res: &Response) -> bool {
    if connection_is(req_headers, "close") || connection_is(res.headers(), "close") {
        return true;
    }
    // http/1.0 is non-persistent unless keep-alive was negotiated
    res.version() == Version::HTTP_10 && !connection_is(res.headers(), "keep-alive")
}

fn connection_is(headers: &HeaderMap, token: &str) -> bool {
    headers.get_all(CONNECTION).iter().any(|value| {
        value
            .to_str()
            .map(|value| {
                value
                    .split(',')
                    .any(|part| part.trim().eq_ignore_ascii_case(token))
            })
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn location_resolves_relative_to_base() {
        let base: Uri = "http://example.org:8080/a/b?q=1".parse().unwrap();
        let uri = resolve_location(&base, "/c").unwrap();
        assert_eq!(uri.to_string(), "http://example.org:8080/c");

        let uri = resolve_location(&base, "https://elsewhere.org/d").unwrap();
        assert_eq!(uri.to_string(), "https://elsewhere.org/d");

        assert!(resolve_location(&base, "no-scheme-no-slash").is_err());
    }

    #[test]
    fn connection_close_policy() {
        let req_headers = HeaderMap::new();

        let mut res = Response::new(Vec::new());
        assert!(!should_close(&req_headers, &res));

        res.headers_mut()
            .insert(CONNECTION, "Close".parse().unwrap());
        assert!(should_close(&req_headers, &res));

        let mut req_headers = HeaderMap::new();
        req_headers.insert(CONNECTION, "close".parse().unwrap());
        assert!(should_close(&req_headers, &Response::new(Vec::new())));
    }

    #[test]
    fn http_10_defaults_to_close() {
        let req_headers = HeaderMap::new();

        let mut res = Response::new(Vec::new());
        *res.version_mut() = Version::HTTP_10;
        assert!(should_close(&req_headers, &res));

        res.headers_mut()
            .insert(CONNECTION, "keep-alive".parse().unwrap());
        assert!(!should_close(&req_headers, &res));
    }
}
