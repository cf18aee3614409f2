use futures_io::AsyncWrite;
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use http::header::{
    HeaderValue, ACCEPT_ENCODING, CONTENT_LENGTH, HOST, TRANSFER_ENCODING, USER_AGENT,
};
use http::request::Parts;

use crate::body::{Body, Inner};
use crate::error::{Error, Result};
use crate::Request;

/// Bounded read size when streaming an outbound body as chunks.
const CHUNK_SIZE: usize = 8192;

/// Normalize a request into the head parts and body actually sent.
///
/// The body type decides the framing headers: a streaming body is chunked and
/// never carries `content-length`, a fixed body carries its exact byte length,
/// and an empty body carries neither. `user-agent` and `accept-encoding` are
/// always overwritten with the client's own values.
pub(crate) fn normalize(
    req: Request,
    user_agent: &'static str,
    accept_encoding: &str,
) -> Result<(Parts, Body)> {
    let (mut parts, body) = req.into_parts();

    match &body.inner {
        Inner::Stream(_) => {
            parts
                .headers
                .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            parts.headers.remove(CONTENT_LENGTH);
        }
        Inner::Fixed(bytes) => {
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
            parts.headers.remove(TRANSFER_ENCODING);
        }
        Inner::Empty => {
            parts.headers.remove(CONTENT_LENGTH);
            parts.headers.remove(TRANSFER_ENCODING);
        }
    }

    parts
        .headers
        .insert(USER_AGENT, HeaderValue::from_static(user_agent));
    let accept = HeaderValue::from_str(accept_encoding)
        .map_err(|_| Error::Config("codec provider produced an invalid encoding list".to_owned()))?;
    parts.headers.insert(ACCEPT_ENCODING, accept);

    Ok((parts, body))
}

/// Build the wire request line and header block.
///
/// Origin-form target normally; the absolute uri when talking proxy-style, in
/// which case no `host` header is written.
pub(crate) fn build_head(parts: &Parts, proxy_style: bool) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);

    let target = if proxy_style {
        parts.uri.to_string()
    } else {
        let mut target = parts.uri.path().to_owned();
        if let Some(query) = parts.uri.query() {
            target.push('?');
            target.push_str(query);
        }
        target
    };

    let line = format!("{} {} HTTP/1.1\r\n", parts.method, target);
    log::trace!("> {}", line.trim_end());
    buf.extend_from_slice(line.as_bytes());

    // Framing and identity headers are written in a fixed order; whatever else
    // the caller set follows.
    if !proxy_style {
        match parts.headers.get(HOST) {
            Some(host) => write_header(&mut buf, "host", host.as_bytes()),
            None => {
                let host = parts
                    .uri
                    .host()
                    .ok_or_else(|| Error::Config("request uri has no host".to_owned()))?;
                let value = match parts.uri.port_u16() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_owned(),
                };
                write_header(&mut buf, "host", value.as_bytes());
            }
        }
    }
    for name in &[USER_AGENT, ACCEPT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING] {
        if let Some(value) = parts.headers.get(name) {
            write_header(&mut buf, name.as_str(), value.as_bytes());
        }
    }
    for (name, value) in parts.headers.iter() {
        if [&HOST, &USER_AGENT, &ACCEPT_ENCODING, &CONTENT_LENGTH, &TRANSFER_ENCODING]
            .contains(&name)
        {
            continue;
        }
        write_header(&mut buf, name.as_str(), value.as_bytes());
    }
    buf.extend_from_slice(b"\r\n");

    Ok(buf)
}

fn write_header(buf: &mut Vec<u8>, name: &str, value: &[u8]) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    // written broken up, because value may contain opaque bytes
    buf.extend_from_slice(value);
    buf.extend_from_slice(b"\r\n");
}

/// Write the head and the body to the stream.
///
/// Fixed bodies go out in one write and stay replayable for redirects; a
/// streaming body is read in bounded chunks, each wrapped in chunked framing,
/// and is consumed by the write.
pub(crate) async fn write_request<W>(stream: &mut W, head: &[u8], body: &mut Body) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream
        .write_all(head)
        .await
        .map_err(|err| Error::Transfer("writing request head", err))?;

    match std::mem::replace(&mut body.inner, Inner::Empty) {
        Inner::Empty => {}
        Inner::Fixed(bytes) => {
            stream
                .write_all(&bytes)
                .await
                .map_err(|err| Error::Transfer("writing request body", err))?;
            body.inner = Inner::Fixed(bytes);
        }
        Inner::Stream(mut reader) => {
            let mut chunk = [0u8; CHUNK_SIZE];
            loop {
                let n = reader
                    .read(&mut chunk)
                    .await
                    .map_err(|err| Error::Transfer("reading outbound body stream", err))?;
                if n == 0 {
                    break;
                }
                log::trace!("> {} byte chunk", n);
                let size_line = format!("{:x}\r\n", n);
                stream
                    .write_all(size_line.as_bytes())
                    .await
                    .map_err(|err| Error::Transfer("writing body chunk", err))?;
                stream
                    .write_all(&chunk[..n])
                    .await
                    .map_err(|err| Error::Transfer("writing body chunk", err))?;
                stream
                    .write_all(b"\r\n")
                    .await
                    .map_err(|err| Error::Transfer("writing body chunk", err))?;
            }
            stream
                .write_all(b"0\r\n\r\n")
                .await
                .map_err(|err| Error::Transfer("writing closing chunk", err))?;
        }
    }

    stream
        .flush()
        .await
        .map_err(|err| Error::Transfer("flushing request", err))?;

    Ok(())
}
