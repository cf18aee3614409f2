#![deny(unsafe_code)]

//! # bowler
//!
//! An async http/1.1 client engine for Rust.
//!
//! ## Issuing a request:
//! - a `bowler::Request` is just an alias for an `http::Request<Body>`, where `Body` is a
//! bowler-specific outbound body. There are convenience methods for constructing bodies from
//! buffers and streams.
//! - body-framing headers are ignored, because the client sets them depending on the type of
//! body set:
//!   - from a streaming reader: transfer-encoding, chunked
//!   - from a buffer (`Vec<u8>` or `String` or `&str`): fixed body with content-length
//!   - `Body::empty()`: no body and no framing headers
//! - responses come back with the body fully read, de-chunked, and decompressed; the status
//! reason phrase is kept in the response extensions as [`ReasonPhrase`].
//! - the transport and the content decoders are injected at construction, so tests can run
//! against an in-memory stream. See `Client::with_connector`.

mod body;
pub mod client;
pub mod connect;
pub mod encoding;
mod error;
mod request;
mod response;
mod timeout;

pub use body::Body;
pub use client::Client;
pub use connect::{Connect, SocketUri, TcpConnector, TlsOptions};
pub use encoding::{ContentDecode, FlateDecode};
pub use error::{Error, Result};
pub use request::Request;
pub use response::{ReasonPhrase, Response};
pub use http;
