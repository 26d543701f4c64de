//! Bundle decoder

use crate::archive::{Bundle, FileRecord, BINARY_MARKER, READ_ERROR_PREFIX, READ_ERROR_SUFFIX};
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use std::path::Path;

// Binary data constants
const BINARY_NEWLINE: u8 = b'\n';
const BINARY_CARRIAGE_RETURN: u8 = b'\r';

/// Decoded view of a record's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Text content, stored as-is
    Text(&'a str),
    /// Bytes restored from the base64 payload
    Binary(Vec<u8>),
    /// The message of a read-error placeholder
    ReadError(&'a str),
}

impl FileRecord {
    /// Decode the content back into the data it was built from
    pub fn payload(&self) -> Result<Payload<'_>> {
        if let Some(encoded) = self.content.strip_prefix(BINARY_MARKER) {
            let cleaned: String = encoded
                .bytes()
                .filter(|&c| c != BINARY_NEWLINE && c != BINARY_CARRIAGE_RETURN)
                .map(char::from)
                .collect();
            let data = base64::engine::general_purpose::STANDARD
                .decode(cleaned)
                .map_err(|e| anyhow!("Failed to decode base64 for file '{}': {}", self.path, e))?;
            return Ok(Payload::Binary(data));
        }

        if self.is_read_error() {
            let message = &self.content[READ_ERROR_PREFIX.len()..self.content.len() - READ_ERROR_SUFFIX.len()];
            return Ok(Payload::ReadError(message));
        }

        Ok(Payload::Text(&self.content))
    }
}

/// Decodes a JSON bundle
pub struct Decoder;

impl Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode a bundle from a string
    pub fn decode(&self, input: &str) -> Result<Bundle> {
        let bundle: Bundle = serde_json::from_str(input).context("Invalid bundle JSON")?;
        tracing::debug!(records = bundle.len(), "decoded bundle");
        Ok(bundle)
    }

    /// Decode a bundle from a file
    pub fn decode_from_file(&self, path: &Path) -> Result<Bundle> {
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        self.decode(&input)
            .with_context(|| format!("Failed to decode: {}", path.display()))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
