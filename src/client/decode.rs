use futures_io::AsyncRead;
use futures_util::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use http::header::{
    HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING,
};
use http::{Response as HttpResponse, StatusCode, Version};

use crate::encoding::ContentDecode;
use crate::error::{Error, Result};
use crate::response::{ReasonPhrase, Response};

const LF: u8 = b'\n';
const MAX_HEADERS: usize = 128;
const MAX_HEAD_LENGTH: usize = 8 * 1024;

/// Read and parse the status line and header block.
///
/// The returned response has an empty body; `read_body` fills it in when the
/// status code permits one.
pub(crate) async fn decode_head<R>(reader: &mut BufReader<R>) -> Result<Response>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();

    // Keep reading lines until the empty line ends the head. The failure kind
    // depends on whether anything arrived at all.
    loop {
        let bytes_read = match reader.read_until(LF, &mut buf).await {
            Ok(n) => n,
            Err(err) if buf.is_empty() => {
                log::debug!("read failed before any response bytes: {}", err);
                return Err(Error::NoResponse);
            }
            Err(err) => return Err(Error::Transfer("reading response head", err)),
        };

        // No more bytes are yielded from the stream.
        if bytes_read == 0 {
            if buf.is_empty() {
                return Err(Error::NoResponse);
            }
            return Err(Error::MessageParse(
                "connection closed inside response head".to_owned(),
            ));
        }

        // Prevent unbounded buffering on absurd header blocks.
        if buf.len() > MAX_HEAD_LENGTH {
            return Err(Error::MessageParse(
                "response head longer than 8kb".to_owned(),
            ));
        }

        // We've hit the end delimiter of the head.
        let idx = buf.len() - 1;
        if idx >= 3 && &buf[idx - 3..=idx] == b"\r\n\r\n" {
            break;
        }
        if idx >= 1 && &buf[idx - 1..=idx] == b"\n\n" {
            break;
        }
    }

    // Validate the whole head in one go. This enforces the status-line shape
    // (HTTP/<v> <3-digit code> <reason>) and the Name: Value shape of every
    // header line.
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut headers);
    let status = parsed
        .parse(&buf)
        .map_err(|err| Error::MessageParse(err.to_string()))?;
    if status.is_partial() {
        return Err(Error::MessageParse("incomplete response head".to_owned()));
    }

    let code = parsed
        .code
        .ok_or_else(|| Error::MessageParse("no status code".to_owned()))?;
    let code = StatusCode::from_u16(code)
        .map_err(|_| Error::MessageParse(format!("bad status code {}", code)))?;
    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        v => return Err(Error::MessageParse(format!("unsupported http version {:?}", v))),
    };
    let reason = parsed.reason.unwrap_or("").to_owned();

    let mut res = HttpResponse::new(Vec::new());
    *res.status_mut() = code;
    *res.version_mut() = version;
    res.extensions_mut().insert(ReasonPhrase(reason));
    for header in parsed.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|err| Error::MessageParse(err.to_string()))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|err| Error::MessageParse(err.to_string()))?;
        // last value wins
        res.headers_mut().insert(name, value);
    }

    log::trace!("< {:?} {}", res.version(), res.status());
    Ok(res)
}

/// Whether the status code permits an entity body at all.
///
/// 1xx, 204 and 304 never carry one, whatever the headers claim.
pub(crate) fn body_allowed(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Read the entity body, picking the strategy from the headers: chunked, then
/// content-length, then read-until-close. Applies content-encoding decoding
/// before storing the bytes on the response.
pub(crate) async fn read_body<R>(
    reader: &mut BufReader<R>,
    res: &mut Response,
    decoder: &dyn ContentDecode,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut body = if is_chunked(res) {
        read_chunked(reader).await?
    } else if let Some(len) = content_length(res)? {
        read_fixed(reader, len).await?
    } else {
        read_to_close(reader).await?
    };

    if let Some(encoding) = res.headers().get(CONTENT_ENCODING) {
        let encoding = encoding.to_str().unwrap_or("").trim();
        if !encoding.is_empty() && !encoding.eq_ignore_ascii_case("identity") {
            match decoder.decode(encoding, &body) {
                Some(Ok(decoded)) => body = decoded,
                Some(Err(err)) => {
                    // A decoder we have, fed bytes it cannot unpack. Hand the
                    // raw bytes to the caller rather than dropping them.
                    log::debug!("failed to decode {} body: {}", encoding, err);
                }
                None => {
                    log::trace!("unsupported content-encoding {}", encoding);
                }
            }
        }
    }

    *res.body_mut() = body;
    Ok(())
}

fn is_chunked(res: &Response) -> bool {
    res.headers()
        .get_all(TRANSFER_ENCODING)
        .iter()
        .last()
        .map(|value| {
            String::from_utf8_lossy(value.as_bytes())
                .trim()
                .eq_ignore_ascii_case("chunked")
        })
        .unwrap_or(false)
}

fn content_length(res: &Response) -> Result<Option<usize>> {
    match res.headers().get_all(CONTENT_LENGTH).iter().last() {
        Some(value) => {
            let len = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| Error::MessageParse("invalid content-length".to_owned()))?;
            Ok(Some(len))
        }
        None => Ok(None),
    }
}

/// De-chunk: hex size line, that many bytes, crlf, repeat; a zero-size chunk
/// ends the body after any trailer lines are discarded.
async fn read_chunked<R>(reader: &mut BufReader<R>) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    loop {
        let mut line = Vec::new();
        let bytes_read = reader
            .read_until(LF, &mut line)
            .await
            .map_err(|err| Error::Transfer("reading chunk size", err))?;
        if bytes_read == 0 {
            return Err(Error::Transfer("reading chunk size", eof()));
        }

        let size = chunk_size(&line)?;
        if size == 0 {
            // Trailers are legal here; discard them up to the blank line.
            loop {
                let mut trailer = Vec::new();
                let bytes_read = reader
                    .read_until(LF, &mut trailer)
                    .await
                    .map_err(|err| Error::Transfer("reading chunk terminator", err))?;
                if bytes_read == 0 || trailer == b"\r\n" || trailer == b"\n" {
                    break;
                }
            }
            return Ok(out);
        }

        let start = out.len();
        out.resize(start + size, 0);
        reader
            .read_exact(&mut out[start..])
            .await
            .map_err(|err| Error::Transfer("reading chunk data", err))?;

        let mut crlf = [0u8; 2];
        reader
            .read_exact(&mut crlf)
            .await
            .map_err(|err| Error::Transfer("reading chunk data", err))?;
        if &crlf != b"\r\n" {
            return Err(Error::Transfer(
                "reading chunk data",
                std::io::Error::new(std::io::ErrorKind::InvalidData, "chunk not crlf-terminated"),
            ));
        }
    }
}

fn chunk_size(line: &[u8]) -> Result<usize> {
    let line = String::from_utf8_lossy(line);
    let size = line.trim();
    // chunk extensions after ';' are tolerated and ignored
    let size = size.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size, 16).map_err(|_| {
        Error::Transfer(
            "reading chunk size",
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("bad chunk size line: {:?}", line.trim()),
            ),
        )
    })
}

/// Read exactly `len` bytes, accumulating partial reads.
async fn read_fixed<R>(reader: &mut BufReader<R>, len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    // Zero length means zero reads.
    if len == 0 {
        return Ok(Vec::new());
    }
    let mut buf = vec![0; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|err| Error::Transfer("reading fixed-length body", err))?;
    Ok(buf)
}

/// No framing headers at all: the body is everything until the peer closes.
async fn read_to_close<R>(reader: &mut BufReader<R>) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|err| Error::Transfer("reading body", err))?;
    Ok(buf)
}

fn eof() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed")
}
