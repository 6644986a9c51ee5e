use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use super::types::EntryKind;

pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Compiled rules from one `.gitignore`, tagged with the modification time of
/// the file they were compiled from.
struct CachedRules {
    matcher: Gitignore,
    modified: SystemTime,
}

/// Per-directory cache of compiled `.gitignore` rule sets.
///
/// An entry is reused only while the file's mtime equals the recorded one
/// (exact equality, so content restored with an older mtime is also picked
/// up). There is no time based expiry. Entries are immutable and swapped as a
/// whole, so concurrent readers never see new rules with an old timestamp.
#[derive(Default)]
pub struct IgnoreCache {
    entries: RwLock<HashMap<PathBuf, Arc<CachedRules>>>,
}

impl IgnoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` is ignored by the `.gitignore` directly inside
    /// `base_dir`. Stats `path` to tell files from directories.
    pub fn should_ignore(&self, path: &Path, base_dir: &Path) -> bool {
        self.is_ignored(path, base_dir, EntryKind::of(path))
    }

    /// Like [`Self::should_ignore`] when the entry kind is already known.
    pub fn is_ignored(&self, path: &Path, base_dir: &Path, kind: EntryKind) -> bool {
        self.verdict(path, base_dir, kind) == Some(true)
    }

    /// What the `.gitignore` in `base_dir` says about `path`: `Some(true)` for
    /// ignored, `Some(false)` for re-included by a `!` rule, `None` when no
    /// rule matches or there is no usable file.
    pub fn verdict(&self, path: &Path, base_dir: &Path, kind: EntryKind) -> Option<bool> {
        let rules = self.rules_for(base_dir)?;

        // Rules never apply outside the directory that holds them
        let relative = relative_key(path, base_dir, kind)?;
        let relative = relative.trim_end_matches('/');
        if relative.is_empty() {
            return None;
        }

        match rules
            .matcher
            .matched_path_or_any_parents(relative, kind.is_dir())
        {
            Match::None => None,
            Match::Ignore(_) => Some(true),
            Match::Whitelist(_) => Some(false),
        }
    }

    /// Drop every cached rule set.
    pub fn clear_all(&self) {
        self.write().clear();
        tracing::info!("Cleared .gitignore cache");
    }

    /// Drop the cached rule set for one directory.
    pub fn invalidate(&self, directory: &Path) {
        if self.write().remove(directory).is_some() {
            tracing::debug!("Invalidated .gitignore cache for {}", directory.display());
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, directory: &Path) -> bool {
        self.read().contains_key(directory)
    }

    fn rules_for(&self, directory: &Path) -> Option<Arc<CachedRules>> {
        let ignore_file = directory.join(IGNORE_FILE_NAME);
        let modified = match ignore_file.metadata() {
            Ok(metadata) => match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::error!(?e, "Cannot read mtime of {}", ignore_file.display());
                    return None;
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::error!(?e, "Cannot stat {}", ignore_file.display());
                return None;
            }
        };

        if let Some(cached) = self.read().get(directory) {
            if cached.modified == modified {
                tracing::trace!("Using cached .gitignore for {}", directory.display());
                return Some(cached.clone());
            }
        }

        let matcher = match compile(directory, &ignore_file) {
            Ok(matcher) => matcher,
            Err(e) => {
                // Fail open: a broken ignore file must not hide anything
                tracing::error!("Error loading {}: {e:#}", ignore_file.display());
                return None;
            }
        };

        let rules = Arc::new(CachedRules { matcher, modified });
        self.write().insert(directory.to_path_buf(), rules.clone());
        tracing::debug!("Loaded {}", ignore_file.display());
        Some(rules)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Arc<CachedRules>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, Arc<CachedRules>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn compile(directory: &Path, ignore_file: &Path) -> anyhow::Result<Gitignore> {
    let contents = std::fs::read_to_string(ignore_file)?;
    let mut builder = GitignoreBuilder::new(directory);
    for line in contents.lines() {
        builder.add_line(Some(ignore_file.to_path_buf()), line)?;
    }
    Ok(builder.build()?)
}

/// `path` relative to `base_dir` with `/` separators and a trailing `/` for
/// directories. `None` when `path` is not under `base_dir`.
pub fn relative_key(path: &Path, base_dir: &Path, kind: EntryKind) -> Option<String> {
    let relative = path.strip_prefix(base_dir).ok()?;
    let mut key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if kind.is_dir() {
        key.push('/');
    }
    Some(key)
}

/// Ignore predicate bound to a traversal base.
///
/// The `.gitignore` files of the base and of every directory between the base
/// and the entry are consulted nearest first. The first one with a matching
/// rule decides, so a nested `!pattern` can re-include what an outer file
/// ignores.
#[derive(Clone, Copy)]
pub struct IgnoreFilter<'a> {
    cache: &'a IgnoreCache,
    base: &'a Path,
}

impl<'a> IgnoreFilter<'a> {
    pub fn new(cache: &'a IgnoreCache, base: &'a Path) -> Self {
        Self { cache, base }
    }

    pub fn is_ignored(&self, path: &Path, kind: EntryKind) -> bool {
        let Ok(relative) = path.strip_prefix(self.base) else {
            return false;
        };

        // The base plus every directory strictly between it and the entry
        let mut governing = vec![self.base.to_path_buf()];
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            if components.peek().is_none() {
                break;
            }
            let next = governing[governing.len() - 1].join(component);
            governing.push(next);
        }

        governing
            .iter()
            .rev()
            .find_map(|dir| self.cache.verdict(path, dir, kind))
            .unwrap_or(false)
    }
}
