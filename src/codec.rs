//! Value Codec Module
//!
//! Turns a serialized record into the bytes handed to the backend and back.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Value Codec ==
/// Compact JSON, optionally wrapped in zlib.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCodec {
    compress: bool,
}

impl ValueCodec {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    // == Encode ==
    /// Encodes a value for storage.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(value)?;
        if !self.compress {
            return Ok(json);
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| CacheError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CacheError::Compression(e.to_string()))
    }

    // == Decode ==
    /// Decodes stored bytes. A miss stays a miss without touching the decompressor.
    pub fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<Value>> {
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        if !self.compress {
            return Ok(Some(serde_json::from_slice(bytes)?));
        }

        let mut json = Vec::new();
        ZlibDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| CacheError::Compression(e.to_string()))?;
        Ok(Some(serde_json::from_slice(&json)?))
    }
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new(true)
    }
}
