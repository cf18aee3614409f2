use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// Public errors. Any of these aborts the request in flight; nothing is retried internally.
#[derive(ThisError, Debug)]
pub enum Error {
    /// The client was asked to do something its construction does not support,
    /// e.g. an `https` target on a connector without tls capability.
    #[error("Client configuration error: {0}")]
    Config(String),
    /// The transport could not be opened. Carries the io error verbatim, so the
    /// native error code is available through `raw_os_error()`.
    #[error("Error connecting: {0}")]
    Connect(#[source] std::io::Error),
    /// The connection closed before any response bytes arrived.
    #[error("No response received")]
    NoResponse,
    /// The status line or a header line violates http message syntax.
    #[error("Error parsing response message: {0}")]
    MessageParse(String),
    /// Writing the request or reading the response body failed partway,
    /// including timeouts and premature connection loss.
    #[error("Transfer error while {0}: {1}")]
    Transfer(&'static str, #[source] std::io::Error),
    /// The redirect chain grew past the configured maximum.
    #[error("Exceeded maximum of {0} redirects")]
    RedirectLimit(u32),
}
