//! # git-files-json
//!
//! Pack the files tracked by a git repository into one JSON document.
//!
//! ## Bundle Format
//!
//! A bundle is a JSON array of `{path, content}` objects, in the order git
//! lists the files:
//!
//! ```text
//! [
//!   {
//!     "path": "src/main.rs",
//!     "content": "fn main() {}\n"
//!   },
//!   {
//!     "path": "logo.png",
//!     "content": "[BINARY FILE - BASE64 ENCODED]\niVBORw0KGgo..."
//!   }
//! ]
//! ```
//!
//! ## Binary Detection
//!
//! A file is binary if a null byte occurs in its first 1024 bytes, or if it
//! cannot be opened. Binary content is stored as the marker line followed
//! by standard base64. Text is decoded as UTF-8, invalid sequences are
//! replaced with U+FFFD.
//!
//! ## Failures
//!
//! - A listed file missing on disk produces no record.
//! - A file that cannot be read produces `[ERROR READING FILE: <message>]`.
//! - A git failure is an [`EnumerateError`]; [`list_tracked_files_or_empty`]
//!   turns it into an empty list.

pub mod archive;
pub mod encoder;
pub mod decoder;
pub mod git;

pub use archive::{
    Bundle, FileRecord,
    EncodingConfig, ContentKind, BinaryReason,
    classify_path, detect_kind, detect_kind_within, is_binary_file,
};
pub use encoder::{Encoder, Progress};
pub use decoder::{Decoder, Payload};
pub use git::{list_tracked_files, list_tracked_files_or_empty, EnumerateError};
#[cfg(feature = "walkdir")]
pub use git::list_directory_files;
