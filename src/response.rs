use http::Response as HttpResponse;

/// A response with its entity body fully read into memory.
pub type Response = HttpResponse<Vec<u8>>;

/// The status-line reason phrase.
///
/// `http::Response` has no slot for it, so the client keeps it in the response
/// extensions: `res.extensions().get::<ReasonPhrase>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonPhrase(pub(crate) String);

impl ReasonPhrase {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReasonPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
