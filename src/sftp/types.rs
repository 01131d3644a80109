//! SFTP data types

use serde::{Deserialize, Serialize};

/// Entry kind as far as callers care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Tag used in listing JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "dir",
        }
    }
}

/// One directory listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub kind: EntryKind,
    /// File name (not full path)
    pub name: String,
    /// Size in bytes, only for non-directories
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            kind: EntryKind::File,
            name: name.into(),
            size: Some(size),
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Directory,
            name: name.into(),
            size: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Result of a remote `stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub kind: EntryKind,
    pub size: u64,
}

impl RemoteMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Listing entry as serialized to callers: `{"type":"file","name":"a","size":3}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingItem {
    #[serde(rename = "type")]
    pub file_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl From<&RemoteEntry> for ListingItem {
    fn from(entry: &RemoteEntry) -> Self {
        Self {
            file_type: entry.kind.as_str().to_string(),
            name: entry.name.clone(),
            size: if entry.is_dir() { None } else { entry.size },
        }
    }
}
