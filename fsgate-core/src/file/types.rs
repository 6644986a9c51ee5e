//! Values returned by file operations. All of them serialize to the JSON
//! shapes sent back to tool-calling clients.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an entry is a file or a directory. Decided once, when the entry is
/// first stat'ed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Follows symlinks; anything that is not a directory counts as a file.
    pub fn of(path: &Path) -> Self {
        if path.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }

    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub items: Vec<DirectoryItem>,
    pub total: usize,
    /// Set when the directory could not be enumerated and the listing was
    /// degraded to empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DirectoryListing {
    pub fn new(items: Vec<DirectoryItem>) -> Self {
        let total = items.len();
        Self {
            items,
            total,
            error: None,
        }
    }

    pub fn degraded(error: String) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: PathBuf,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    /// The depth limit was reached before this directory was expanded.
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TreeNode {
    pub fn leaf(name: String, kind: EntryKind, path: PathBuf) -> Self {
        Self {
            name,
            kind,
            path,
            children: Vec::new(),
            truncated: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub name: String,
    pub path: PathBuf,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchMatch>,
    pub total: usize,
}

impl SearchResults {
    pub fn new(results: Vec<SearchMatch>) -> Self {
        let total = results.len();
        Self { results, total }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
    /// Size in bytes as stored on disk.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    /// Not every platform/filesystem records a creation time.
    pub created: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
    pub is_symlink: bool,
}

/// Outcome of a write-style operation. I/O failures land in `error` rather
/// than being raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok(path: PathBuf) -> Self {
        Self {
            success: true,
            path,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, error: impl ToString) -> Self {
        Self {
            success: false,
            path,
            error: Some(error.to_string()),
        }
    }
}

/// Display name for a path: its final component, or the whole path for roots.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
