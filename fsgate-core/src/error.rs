use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FsError>;

/// Failures raised by filesystem operations.
///
/// Write and directory creation report their I/O failures through
/// [`crate::file::types::OperationResult`] instead; everything here interrupts
/// the operation.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Access denied: '{}' is not within allowed directories. Allowed: {}", .path.display(), join_paths(.allowed))]
    PathNotAllowed { path: PathBuf, allowed: Vec<PathBuf> },

    #[error("Path not found: '{}'", .0.display())]
    PathNotFound(PathBuf),

    #[error("Not a file: '{}'", .0.display())]
    NotAFile(PathBuf),

    #[error("Not a directory: '{}'", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot read file '{}': {reason}", .path.display())]
    FileRead { path: PathBuf, reason: String },

    #[error("Cannot write file '{}': {reason}", .path.display())]
    FileWrite { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FsError {
    /// Stable snake_case name, used in structured error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PathNotAllowed { .. } => "path_not_allowed",
            Self::PathNotFound(_) => "path_not_found",
            Self::NotAFile(_) => "not_a_file",
            Self::NotADirectory(_) => "not_a_directory",
            Self::FileRead { .. } => "file_read_error",
            Self::FileWrite { .. } => "file_write_error",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    /// The offending path, when the failure concerns one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PathNotAllowed { path, .. }
            | Self::PathNotFound(path)
            | Self::NotAFile(path)
            | Self::NotADirectory(path)
            | Self::FileRead { path, .. }
            | Self::FileWrite { path, .. } => Some(path),
            Self::InvalidConfig(_) => None,
        }
    }

    /// Allowed roots carried by a sandbox violation.
    pub fn allowed_directories(&self) -> Option<&[PathBuf]> {
        match self {
            Self::PathNotAllowed { allowed, .. } => Some(allowed),
            _ => None,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
