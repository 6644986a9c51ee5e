use std::path::{Component, Path, PathBuf};

use crate::error::{FsError, Result};

/// A path that resolved inside one of the allowed roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
    canonical: PathBuf,
    lexical: PathBuf,
}

impl ValidatedPath {
    /// Absolute path with `.`/`..` folded and symlinks in its existing prefix
    /// resolved. All I/O goes through this form.
    pub fn as_path(&self) -> &Path {
        &self.canonical
    }

    /// Absolute path as the client named it, before symlink resolution.
    pub fn lexical(&self) -> &Path {
        &self.lexical
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.canonical
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.canonical
    }
}

/// Maps client supplied path strings onto the filesystem and rejects anything
/// that lands outside the allowed roots.
///
/// Order matters: decode, then resolve, then compare. Comparing the raw string
/// would let `..` segments or `%2e%2e` encodings slip past.
#[derive(Debug, Clone)]
pub struct PathValidator {
    roots: Vec<PathBuf>,
}

impl PathValidator {
    /// Roots are resolved the same way operation paths are. Missing roots are
    /// kept with a warning so they start working once created.
    pub fn new(allowed_roots: Vec<PathBuf>) -> Self {
        let mut roots: Vec<PathBuf> = Vec::with_capacity(allowed_roots.len());
        for root in allowed_roots {
            let resolved = resolve(&root);
            if !resolved.exists() {
                tracing::warn!("Allowed directory does not exist: {}", resolved.display());
            }
            if !roots.contains(&resolved) {
                roots.push(resolved);
            }
        }
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Decode and resolve a raw path string to an absolute path. Never fails:
    /// unusual but legal characters (spaces, `#`, `@`, brackets) pass through.
    pub fn normalize(&self, raw: &str) -> PathBuf {
        resolve(&decode(raw))
    }

    /// Succeeds iff `path` is a root or lies beneath one.
    pub fn validate(&self, path: &Path) -> Result<()> {
        // Path::starts_with compares whole components: /srv/ab is not in /srv/a
        if self.roots.iter().any(|root| path.starts_with(root)) {
            return Ok(());
        }
        Err(FsError::PathNotAllowed {
            path: path.to_path_buf(),
            allowed: self.roots.clone(),
        })
    }

    pub fn normalize_and_validate(&self, raw: &str) -> Result<ValidatedPath> {
        let decoded = decode(raw);
        let lexical = absolute_lexical(&decoded);
        let canonical = canonicalize_existing_prefix(&lexical);
        self.validate(&canonical)?;
        Ok(ValidatedPath { canonical, lexical })
    }
}

/// Percent-decode. Invalid UTF-8 in the decoded bytes is replaced rather than
/// rejected.
fn decode(raw: &str) -> PathBuf {
    let bytes = urlencoding::decode_binary(raw.as_bytes());
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn resolve(path: &Path) -> PathBuf {
    canonicalize_existing_prefix(&absolute_lexical(path))
}

/// Make `path` absolute against the working directory and fold `.`/`..`
/// without touching the filesystem. `..` never climbs above the root.
fn absolute_lexical(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            // Left relative, so it cannot match any (absolute) root
            Err(e) => {
                tracing::warn!(?e, "Cannot determine working directory");
                path.to_path_buf()
            }
        }
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and re-append the remainder, so
/// symlinks above a not-yet-created file are still resolved.
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for name in tail.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}
