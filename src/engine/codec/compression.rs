use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use lz4_flex::block::{
    compress_prepend_size as lz4_compress, decompress_size_prepended as lz4_decompress,
};
use serde::Deserialize;

use crate::engine::errors::{ExchangeError, Result};

pub const FLAG_LZ4: u8 = 0x01;

pub trait CompressionCodec {
    fn flag(&self) -> u8;
    fn compress(&self, input: &[u8]) -> Vec<u8>;
    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>>;
}

pub struct Lz4Codec;

impl CompressionCodec for Lz4Codec {
    fn flag(&self) -> u8 {
        FLAG_LZ4
    }

    fn compress(&self, input: &[u8]) -> Vec<u8> {
        lz4_compress(input)
    }

    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        let out = lz4_decompress(input)
            .map_err(|e| ExchangeError::format(format!("lz4 decompress: {e}")))?;
        if out.len() != uncompressed_len {
            return Err(ExchangeError::format(format!(
                "lz4 body is {} bytes, header says {uncompressed_len}",
                out.len()
            )));
        }
        Ok(out)
    }
}

/// Body compression applied to batch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    pub fn flags(self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Lz4 => Lz4Codec.flag(),
        }
    }

    pub fn from_flags(flags: u8) -> Result<Self> {
        match flags {
            0 => Ok(Compression::None),
            FLAG_LZ4 => Ok(Compression::Lz4),
            other => Err(ExchangeError::format(format!(
                "unknown batch flags {other:#04x}"
            ))),
        }
    }

    pub fn compress(self, body: &[u8]) -> Cow<'_, [u8]> {
        match self {
            Compression::None => Cow::Borrowed(body),
            Compression::Lz4 => Cow::Owned(Lz4Codec.compress(body)),
        }
    }

    pub fn decompress(self, body: &[u8], uncompressed_len: usize) -> Result<Cow<'_, [u8]>> {
        match self {
            Compression::None => {
                if body.len() != uncompressed_len {
                    return Err(ExchangeError::format(format!(
                        "batch body is {} bytes, header says {uncompressed_len}",
                        body.len()
                    )));
                }
                Ok(Cow::Borrowed(body))
            }
            Compression::Lz4 => Lz4Codec.decompress(body, uncompressed_len).map(Cow::Owned),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            Compression::Lz4 => f.write_str("lz4"),
        }
    }
}

impl FromStr for Compression {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Compression::None),
            "lz4" => Ok(Compression::Lz4),
            other => Err(ExchangeError::Config(format!(
                "unknown compression '{other}'"
            ))),
        }
    }
}
