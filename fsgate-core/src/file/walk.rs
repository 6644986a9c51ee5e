//! Directory listing, tree building and name search over validated paths.
//!
//! Enumeration failures below the starting directory never fail the call:
//! listings degrade to empty, tree nodes carry an `error`, and search drops
//! the unreadable branch. Each is logged.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::ignore::IgnoreFilter;
use super::resolver::{PathValidator, ValidatedPath};
use super::types::{
    display_name, DirectoryItem, DirectoryListing, EntryKind, SearchMatch, TreeNode,
};
use crate::error::{FsError, Result};

/// Immediate children of `dir`, sorted by raw name.
pub fn list_directory(
    dir: &ValidatedPath,
    filter: Option<&IgnoreFilter<'_>>,
) -> Result<DirectoryListing> {
    let dir = dir.as_path();
    require_directory(dir)?;

    let entries = match read_sorted(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(?e, "Permission denied accessing {}", dir.display());
            return Ok(DirectoryListing::degraded(format!("Permission denied: {e}")));
        }
    };

    let items: Vec<DirectoryItem> = entries
        .into_iter()
        .filter(|(path, kind)| !filter.is_some_and(|f| f.is_ignored(path, *kind)))
        .map(|(path, kind)| DirectoryItem {
            name: display_name(&path),
            kind,
            path,
        })
        .collect();

    debug!("Listed directory: {} ({} items)", dir.display(), items.len());
    Ok(DirectoryListing::new(items))
}

/// Depth-first tree of `dir`. The root is depth 0 and a directory is expanded
/// only while its depth is below `max_depth`; deeper directories come back
/// with `truncated` set and no children.
///
/// A symlinked directory is expanded only when its target is inside the
/// allowed roots; otherwise the node carries an `error` and no children.
pub fn build_tree(
    dir: &ValidatedPath,
    max_depth: usize,
    validator: &PathValidator,
    filter: Option<&IgnoreFilter<'_>>,
) -> Result<TreeNode> {
    let root = dir.as_path();
    require_directory(root)?;

    let walk = TreeWalk {
        max_depth,
        validator,
        filter,
    };
    let tree = walk.expand(root.to_path_buf(), EntryKind::Directory, 0);
    info!("Generated tree for: {}", root.display());
    Ok(tree)
}

struct TreeWalk<'a> {
    max_depth: usize,
    validator: &'a PathValidator,
    filter: Option<&'a IgnoreFilter<'a>>,
}

impl TreeWalk<'_> {
    fn expand(&self, path: PathBuf, kind: EntryKind, depth: usize) -> TreeNode {
        let mut node = TreeNode::leaf(display_name(&path), kind, path);
        if !kind.is_dir() {
            return node;
        }

        if depth >= self.max_depth {
            node.truncated = true;
            return node;
        }

        if let Err(e) = self.check_link_target(&node.path) {
            warn!("Not following {}: {e}", node.path.display());
            node.error = Some(match e {
                FsError::PathNotAllowed { .. } => {
                    "Link target outside allowed directories".to_string()
                }
                other => other.to_string(),
            });
            return node;
        }

        match read_sorted(&node.path) {
            Ok(entries) => {
                node.children = entries
                    .into_iter()
                    .filter(|(child, kind)| {
                        !self.filter.is_some_and(|f| f.is_ignored(child, *kind))
                    })
                    .map(|(child, kind)| self.expand(child, kind, depth + 1))
                    .collect();
            }
            Err(e) => {
                warn!(?e, "Cannot read directory {}", node.path.display());
                node.error = Some(error_label(&e));
            }
        }
        node
    }

    /// Symlinks must resolve inside the sandbox before they are descended.
    fn check_link_target(&self, dir: &Path) -> Result<()> {
        let is_link = fs::symlink_metadata(dir)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            return Ok(());
        }
        let target = dir.canonicalize().map_err(|e| FsError::FileRead {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.validator.validate(&target)
    }
}

/// Files under `dir` whose name contains `pattern`, case-insensitively.
/// Ignored directories are pruned, never descended into.
pub fn search_by_name(
    dir: &ValidatedPath,
    pattern: &str,
    filter: Option<&IgnoreFilter<'_>>,
) -> Result<Vec<SearchMatch>> {
    let base = dir.as_path();
    if !base.exists() {
        return Err(FsError::PathNotFound(base.to_path_buf()));
    }

    let needle = pattern.to_lowercase();
    let mut results = Vec::new();

    let walker = WalkDir::new(base)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !filter.is_some_and(|f| f.is_ignored(entry.path(), entry_kind(entry)))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(?e, "Skipping unreadable path during search in {}", base.display());
                continue;
            }
        };

        if entry_kind(&entry).is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !name.to_lowercase().contains(&needle) {
            continue;
        }

        let path = entry.path().to_path_buf();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        results.push(SearchMatch {
            name: name.into_owned(),
            path,
            directory,
        });
    }

    info!(
        "Search in {} for '{}': {} results",
        base.display(),
        pattern,
        results.len()
    );
    Ok(results)
}

/// Links are not followed during the walk, but a link to a directory is still
/// a directory: never matched as a file, and judged as one by ignore rules.
fn entry_kind(entry: &walkdir::DirEntry) -> EntryKind {
    if entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir()) {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

fn require_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(FsError::PathNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(FsError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Children of `dir` with their kinds, sorted by name. Entries that vanish or
/// cannot be stat'ed mid-listing are skipped.
fn read_sorted(dir: &Path) -> std::io::Result<Vec<(PathBuf, EntryKind)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(?e, "Failed to read entry in {}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        let kind = EntryKind::of(&path);
        entries.push((entry.file_name(), path, kind));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries
        .into_iter()
        .map(|(_, path, kind)| (path, kind))
        .collect())
}

fn error_label(e: &std::io::Error) -> String {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        "Permission denied".to_string()
    } else {
        e.to_string()
    }
}
