//! Bundle data structures and binary sniffing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

// Bundle format constants
pub const SNIFF_WINDOW: usize = 1024;
pub const BINARY_MARKER: &str = "[BINARY FILE - BASE64 ENCODED]\n";
pub const READ_ERROR_PREFIX: &str = "[ERROR READING FILE: ";
pub const READ_ERROR_SUFFIX: &str = "]";

/// Repository the CLI packs when no directory is given
pub const DEFAULT_REPO_DIR: &str = "/home/ubuntu/trainable_chatbot";
/// Where the CLI writes the bundle when no output is given
pub const DEFAULT_OUTPUT: &str = "/home/ubuntu/files_to_push.json";

/// Configuration for reading file content
#[derive(Debug, Clone)]
pub struct EncodingConfig {
    /// Number of leading bytes inspected for a null byte
    pub sniff_window: usize,
    /// Translate `\r\n` and lone `\r` to `\n` in text files
    pub normalize_newlines: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            sniff_window: SNIFF_WINDOW,
            normalize_newlines: true,
        }
    }
}

/// Result of binary sniffing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Binary { reason: BinaryReason },
}

impl ContentKind {
    pub fn is_binary(&self) -> bool {
        matches!(self, ContentKind::Binary { .. })
    }
}

/// Reason why a file is treated as binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryReason {
    /// A null byte appeared inside the sniff window
    NullByte,
    /// The file could not be opened or read
    Unreadable,
}

/// Classify a leading byte window. Only the first [`SNIFF_WINDOW`] bytes count.
pub fn detect_kind(data: &[u8]) -> ContentKind {
    detect_kind_within(data, SNIFF_WINDOW)
}

/// Classify by the first `window` bytes of `data`
pub fn detect_kind_within(data: &[u8], window: usize) -> ContentKind {
    if data[..data.len().min(window)].contains(&0) {
        ContentKind::Binary { reason: BinaryReason::NullByte }
    } else {
        ContentKind::Text
    }
}

/// Classify a file on disk by reading up to `window` leading bytes.
///
/// Any failure to open or read the file classifies it as binary.
pub fn classify_path(path: &Path, window: usize) -> ContentKind {
    let mut head = Vec::with_capacity(window);
    let read = fs::File::open(path)
        .and_then(|file| file.take(window as u64).read_to_end(&mut head));

    match read {
        Ok(_) => detect_kind_within(&head, window),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "sniff failed, treating as binary");
            ContentKind::Binary { reason: BinaryReason::Unreadable }
        }
    }
}

/// Boolean form of [`classify_path`] with the default window
pub fn is_binary_file(path: &Path) -> bool {
    classify_path(path, SNIFF_WINDOW).is_binary()
}

/// One packed file: its repository-relative path and its rendered content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Whether the content carries the base64 marker line
    pub fn is_binary(&self) -> bool {
        self.content.starts_with(BINARY_MARKER)
    }

    /// Whether the content is a read-error placeholder
    pub fn is_read_error(&self) -> bool {
        self.content.starts_with(READ_ERROR_PREFIX) && self.content.ends_with(READ_ERROR_SUFFIX)
    }
}

/// Render the placeholder stored when a file cannot be read
pub fn read_error_content(message: impl std::fmt::Display) -> String {
    format!("{}{}{}", READ_ERROR_PREFIX, message, READ_ERROR_SUFFIX)
}

/// Ordered collection of records, serialized as a bare JSON array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle {
    pub records: Vec<FileRecord>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FileRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// First record with the given path
    pub fn find(&self, path: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.path == path)
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_kind_text() {
        assert_eq!(detect_kind(b"hello\nworld"), ContentKind::Text);
        assert_eq!(detect_kind(b""), ContentKind::Text);
    }

    #[test]
    fn test_detect_kind_null_byte() {
        assert_eq!(
            detect_kind(&[0x00, 0x01]),
            ContentKind::Binary { reason: BinaryReason::NullByte }
        );
    }

    #[test]
    fn test_detect_kind_ignores_bytes_past_window() {
        let mut data = vec![b'a'; SNIFF_WINDOW];
        data.push(0);
        assert_eq!(detect_kind(&data), ContentKind::Text);

        data[SNIFF_WINDOW - 1] = 0;
        assert!(detect_kind(&data).is_binary());
    }

    #[test]
    fn test_classify_path_window_boundary() {
        let dir = TempDir::new().unwrap();

        let late = dir.path().join("late.dat");
        let mut data = vec![b'x'; SNIFF_WINDOW];
        data.push(0);
        fs::write(&late, &data).unwrap();
        assert_eq!(classify_path(&late, SNIFF_WINDOW), ContentKind::Text);

        let early = dir.path().join("early.dat");
        fs::write(&early, b"ab\0cd").unwrap();
        assert_eq!(
            classify_path(&early, SNIFF_WINDOW),
            ContentKind::Binary { reason: BinaryReason::NullByte }
        );
    }

    #[test]
    fn test_classify_path_honors_custom_window() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.dat");
        fs::write(&path, b"abcd\0").unwrap();

        assert_eq!(classify_path(&path, 4), ContentKind::Text);
        assert_eq!(classify_path(&path, 4), detect_kind_within(b"abcd\0", 4));
        assert_eq!(
            classify_path(&path, 5),
            ContentKind::Binary { reason: BinaryReason::NullByte }
        );
    }

    #[test]
    fn test_classify_path_invalid_utf8_is_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();
        assert!(!is_binary_file(&path));
    }

    #[test]
    fn test_classify_path_missing_is_binary() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            classify_path(&dir.path().join("nope"), SNIFF_WINDOW),
            ContentKind::Binary { reason: BinaryReason::Unreadable }
        );
    }

    #[test]
    fn test_record_flags() {
        let bin = FileRecord::new("a.bin", format!("{}AAE=", BINARY_MARKER));
        assert!(bin.is_binary());
        assert!(!bin.is_read_error());

        let err = FileRecord::new("b", read_error_content("Permission denied (os error 13)"));
        assert_eq!(err.content, "[ERROR READING FILE: Permission denied (os error 13)]");
        assert!(err.is_read_error());
        assert!(!err.is_binary());
    }

    #[test]
    fn test_bundle_serializes_as_array() {
        let mut bundle = Bundle::new();
        bundle.push(FileRecord::new("a.txt", "hello"));
        let json = serde_json::to_string(&bundle).unwrap();
        assert_eq!(json, r#"[{"path":"a.txt","content":"hello"}]"#);
        assert_eq!(bundle.find("a.txt").map(|r| r.content.as_str()), Some("hello"));
        assert!(bundle.find("b.txt").is_none());
    }
}
