use std::fmt;

use futures_io::AsyncRead;

/// An outbound request body.
///
/// The variant decides the transfer framing: a fixed buffer is sent with a
/// `content-length` header, a streaming reader is sent chunked, and an empty
/// body gets no framing headers at all.
pub struct Body {
    pub(crate) inner: Inner,
}

pub(crate) enum Inner {
    Empty,
    Fixed(Vec<u8>),
    Stream(Box<dyn AsyncRead + Unpin + Send + Sync + 'static>),
}

impl Body {
    /// A request with no entity body.
    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    /// A fixed body from a buffer. Sent with an exact `content-length`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            inner: Inner::Fixed(bytes),
        }
    }

    /// A body read out of `reader` at request-write time, in bounded chunks,
    /// and sent with `transfer-encoding: chunked`. Large bodies are never
    /// buffered whole.
    pub fn from_reader(reader: impl AsyncRead + Unpin + Send + Sync + 'static) -> Self {
        Self {
            inner: Inner::Stream(Box::new(reader)),
        }
    }

    /// Byte length of a fixed body; `None` for empty or streaming bodies.
    pub fn len(&self) -> Option<usize> {
        match &self.inner {
            Inner::Fixed(bytes) => Some(bytes.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.inner, Inner::Empty)
    }

    pub(crate) fn is_stream(&self) -> bool {
        matches!(self.inner, Inner::Stream(_))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }
}

impl<'a> From<&'a str> for Body {
    fn from(s: &'a str) -> Self {
        Self::from_bytes(s.to_owned().into_bytes())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("Body::Empty"),
            Inner::Fixed(bytes) => write!(f, "Body::Fixed({} bytes)", bytes.len()),
            Inner::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}
