//! Bundle encoder: reads files and writes the JSON document

use crate::archive::{classify_path, read_error_content, Bundle, EncodingConfig, FileRecord, BINARY_MARKER};
use anyhow::{Context, Result};
use base64::Engine;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Progress of a [`Encoder::collect`] run. Indexes are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<'a> {
    Started { total: usize },
    Added { index: usize, total: usize, path: &'a str },
    Skipped { index: usize, total: usize, path: &'a str },
}

/// Reads files into records and encodes bundles as JSON
pub struct Encoder {
    config: EncodingConfig,
}

impl Encoder {
    /// Create a new encoder with the default config
    pub fn new() -> Self {
        Self::with_config(EncodingConfig::default())
    }

    pub fn with_config(config: EncodingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Read a file's content as it is stored in a record.
    ///
    /// Never fails: I/O errors are rendered into the returned string.
    pub fn read_content(&self, path: &Path) -> String {
        match self.try_read_content(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read file");
                read_error_content(err)
            }
        }
    }

    fn try_read_content(&self, path: &Path) -> std::io::Result<String> {
        let kind = classify_path(path, self.config.sniff_window);
        let data = fs::read(path)?;

        if kind.is_binary() {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
            return Ok(format!("{}{}", BINARY_MARKER, encoded));
        }

        let text = String::from_utf8_lossy(&data);
        Ok(if self.config.normalize_newlines {
            normalize_newlines(&text)
        } else {
            text.into_owned()
        })
    }

    /// Build a bundle from `paths`, each resolved against `root`.
    ///
    /// Paths missing on disk are skipped. Output order follows `paths`.
    pub fn collect<S, F>(&self, root: &Path, paths: &[S], mut observer: F) -> Bundle
    where
        S: AsRef<str>,
        F: FnMut(Progress<'_>),
    {
        let total = paths.len();
        let mut bundle = Bundle::new();
        observer(Progress::Started { total });

        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let index = i + 1;
            let full = root.join(path);

            if full.exists() {
                let content = self.read_content(&full);
                tracing::debug!(path, bytes = content.len(), "added");
                bundle.push(FileRecord::new(path, content));
                observer(Progress::Added { index, total, path });
            } else {
                tracing::debug!(path, "not found on disk");
                observer(Progress::Skipped { index, total, path });
            }
        }

        bundle
    }

    /// Encode a bundle as indented JSON
    pub fn encode(&self, bundle: &Bundle) -> Result<String> {
        Ok(serde_json::to_string_pretty(bundle)?)
    }

    /// Encode a bundle directly to a writer
    pub fn encode_to_writer<W: Write>(&self, bundle: &Bundle, writer: W) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer_pretty(&mut writer, bundle)?;
        writer.flush()?;
        Ok(())
    }

    /// Encode a bundle to a file, replacing any previous content
    pub fn encode_to_file(&self, bundle: &Bundle, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create: {}", path.display()))?;
        self.encode_to_writer(bundle, file)
            .with_context(|| format!("Failed to write: {}", path.display()))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate `\r\n` and lone `\r` line endings to `\n`
fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}
