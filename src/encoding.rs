//! Content-encoding decoders.
//!
//! The provider is injected into the `Client`; its encoding list is what gets
//! advertised in `accept-encoding`.

use std::io::{self, Read};

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

/// Reverses `content-encoding` transformations on response bodies.
pub trait ContentDecode {
    /// Encoding tokens this provider can reverse, in preference order.
    fn encodings(&self) -> &[&'static str];

    /// Decode `data`. `None` means the encoding is not supported and the body
    /// should pass through unmodified.
    fn decode(&self, encoding: &str, data: &[u8]) -> Option<io::Result<Vec<u8>>>;
}

/// gzip and deflate, via flate2.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlateDecode;

impl ContentDecode for FlateDecode {
    fn encodings(&self) -> &[&'static str] {
        &["gzip", "deflate"]
    }

    fn decode(&self, encoding: &str, data: &[u8]) -> Option<io::Result<Vec<u8>>> {
        if encoding.eq_ignore_ascii_case("gzip") {
            let mut out = Vec::new();
            Some(GzDecoder::new(data).read_to_end(&mut out).map(|_| out))
        } else if encoding.eq_ignore_ascii_case("deflate") {
            // Servers disagree on whether deflate means zlib-wrapped or raw
            // deflate. Try the rfc meaning first, then the raw stream.
            let mut out = Vec::new();
            match ZlibDecoder::new(data).read_to_end(&mut out) {
                Ok(_) => Some(Ok(out)),
                Err(_) => {
                    let mut out = Vec::new();
                    Some(DeflateDecoder::new(data).read_to_end(&mut out).map(|_| out))
                }
            }
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::read::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;

    const PLAIN: &[u8] = b"When in the chronicle of wasted time";

    fn encode<R: Read>(mut encoder: R) -> Vec<u8> {
        let mut out = Vec::new();
        encoder.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn gzip_round_trip() {
        let encoded = encode(GzEncoder::new(PLAIN, Compression::default()));
        let decoded = FlateDecode.decode("gzip", &encoded).unwrap().unwrap();
        assert_eq!(decoded, PLAIN);
    }

    #[test]
    fn deflate_round_trip_zlib_wrapped() {
        let encoded = encode(ZlibEncoder::new(PLAIN, Compression::default()));
        let decoded = FlateDecode.decode("deflate", &encoded).unwrap().unwrap();
        assert_eq!(decoded, PLAIN);
    }

    #[test]
    fn deflate_round_trip_raw() {
        let encoded = encode(DeflateEncoder::new(PLAIN, Compression::default()));
        let decoded = FlateDecode.decode("deflate", &encoded).unwrap().unwrap();
        assert_eq!(decoded, PLAIN);
    }

    #[test]
    fn unknown_encoding_is_unsupported() {
        assert!(FlateDecode.decode("br", PLAIN).is_none());
        assert!(FlateDecode.decode("not supported", PLAIN).is_none());
    }
}
