use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Fixed level; changing it changes the stored bytes and invalidates existing indexes.
const LEVEL: u32 = 6;

/// Compress a token for storage. The same input always yields the same bytes, so
/// lookups compare the compressed probe against stored tokens directly.
pub fn compress_token(token: &str) -> Result<Vec<u8>> {
    let mut enc = ZlibEncoder::new(Vec::with_capacity(token.len() + 8), Compression::new(LEVEL));
    enc.write_all(token.as_bytes())?;
    Ok(enc.finish()?)
}

pub fn decompress_token(bytes: &[u8]) -> Result<String> {
    let mut out = String::new();
    ZlibDecoder::new(bytes)
        .read_to_string(&mut out)
        .context("corrupt compressed token")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn tokenizer_output_survives_compression() {
        for t in tokenize("Crawlers fetch pages; indexers score café terms über schnell 42") {
            let packed = compress_token(&t).unwrap();
            assert_eq!(decompress_token(&packed).unwrap(), t);
        }
    }

    #[test]
    fn compression_is_deterministic() {
        assert_eq!(compress_token("search").unwrap(), compress_token("search").unwrap());
        assert_ne!(compress_token("search").unwrap(), compress_token("searc").unwrap());
    }

    #[test]
    fn garbage_fails_to_decompress() {
        assert!(decompress_token(b"not zlib").is_err());
    }
}
