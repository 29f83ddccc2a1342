//! Queue types: items, signatures, indices and dispatcher state

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Upload Items
// ============================================================================

/// How an item reaches the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// A file on the local disk, sent with the request
    #[default]
    Local,
    /// A file already sitting in the user's FTP directory, fetched server-side
    Ftp,
    /// Pasted content or a list of URLs; never treated as a duplicate
    New,
}

/// Item status as tracked by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Init,
    Queued,
    Running,
    Success,
    Warning,
    Error,
}

/// One file to upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItem {
    /// File name as shown to the user
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// Delivery mode
    #[serde(default)]
    pub file_mode: FileMode,

    /// Caller-side status
    #[serde(default)]
    pub status: ItemStatus,

    /// Datatype extension (`auto` when unset)
    #[serde(default)]
    pub extension: Option<String>,

    /// Genome build (`?` when unset)
    #[serde(default)]
    pub dbkey: Option<String>,

    /// Local path for `local` items
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Server-side path for `ftp` items
    #[serde(default)]
    pub file_uri: Option<String>,

    /// Pasted text or newline-separated URLs for `new` items
    #[serde(default)]
    pub file_content: Option<String>,

    #[serde(default)]
    pub space_to_tab: bool,

    #[serde(default)]
    pub to_posix_lines: bool,
}

impl UploadItem {
    /// Create a local item with the given name and size
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            file_mode: FileMode::Local,
            status: ItemStatus::Init,
            extension: None,
            dbkey: None,
            file_path: None,
            file_uri: None,
            file_content: None,
            space_to_tab: false,
            to_posix_lines: false,
        }
    }

    /// Local file on disk
    pub fn local(name: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(path.into()),
            ..Self::new(name, size)
        }
    }

    /// File in the user's FTP directory, ready for the bulk path
    pub fn ftp(name: impl Into<String>, size: u64, uri: impl Into<String>) -> Self {
        Self {
            file_mode: FileMode::Ftp,
            status: ItemStatus::Queued,
            file_uri: Some(uri.into()),
            ..Self::new(name, size)
        }
    }

    /// Pasted content; bypasses duplicate suppression
    pub fn pasted(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            file_mode: FileMode::New,
            file_content: Some(content.clone()),
            ..Self::new(name, content.len() as u64)
        }
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_dbkey(mut self, dbkey: impl Into<String>) -> Self {
        self.dbkey = Some(dbkey.into());
        self
    }

    /// Duplicate-detection key
    pub fn signature(&self) -> Signature {
        Signature(format!("{}{}", self.name, self.size))
    }

    /// Items in `new` mode skip signature tracking entirely
    pub fn is_force_new(&self) -> bool {
        self.file_mode == FileMode::New
    }

    /// Eligible for the bulk remote-fetch path
    pub fn is_remote_fetch(&self) -> bool {
        self.status == ItemStatus::Queued && self.file_mode == FileMode::Ftp
    }
}

// ============================================================================
// Keys
// ============================================================================

/// Name and size concatenated
///
/// Two different files with the same name and size collide; that is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Admission index, rendered as a decimal string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QueueIndex(u64);

impl QueueIndex {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for QueueIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<QueueIndex> for String {
    fn from(index: QueueIndex) -> Self {
        index.0.to_string()
    }
}

impl TryFrom<String> for QueueIndex {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map(Self)
    }
}

impl fmt::Display for QueueIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live queue entry
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub index: QueueIndex,
    pub item: UploadItem,
}

// ============================================================================
// Dispatcher State
// ============================================================================

/// Dispatcher lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// Not draining; `add` is accepted
    #[default]
    Idle,
    /// Draining, between submissions
    Running,
    /// `stop` was called; the loop halts at the next step boundary
    PauseRequested,
    /// One submission in flight
    Draining,
}

impl DispatchState {
    pub fn is_running(self) -> bool {
        self != Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_name_and_size() {
        let item = UploadItem::new("reads.fastq", 1024);
        assert_eq!(item.signature().to_string(), "reads.fastq1024");
    }

    #[test]
    fn test_signature_collides_on_concatenation() {
        let a = UploadItem::new("a1", 23);
        let b = UploadItem::new("a", 123);
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_pasted_is_force_new() {
        let item = UploadItem::pasted("Pasted Entry", "ACGT");
        assert!(item.is_force_new());
        assert_eq!(item.size, 4);
        assert!(!UploadItem::new("x", 1).is_force_new());
    }

    #[test]
    fn test_remote_fetch_needs_queued_ftp() {
        assert!(UploadItem::ftp("a.bed", 10, "a.bed").is_remote_fetch());
        assert!(!UploadItem::ftp("a.bed", 10, "a.bed")
            .with_status(ItemStatus::Init)
            .is_remote_fetch());
        assert!(!UploadItem::new("a.bed", 10)
            .with_status(ItemStatus::Queued)
            .is_remote_fetch());
    }

    #[test]
    fn test_index_serializes_as_string() {
        let json = serde_json::to_string(&QueueIndex::from(7)).unwrap();
        assert_eq!(json, "\"7\"");
        let back: QueueIndex = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(back, QueueIndex::from(12));
    }

    #[test]
    fn test_item_deserializes_with_defaults() {
        let item: UploadItem =
            serde_json::from_str(r#"{"name":"x.txt","size":3,"fileMode":"ftp"}"#).unwrap();
        assert_eq!(item.file_mode, FileMode::Ftp);
        assert_eq!(item.status, ItemStatus::Init);
        assert!(!item.to_posix_lines);
    }
}
