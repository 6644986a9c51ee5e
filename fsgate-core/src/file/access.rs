use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{FsError, Result};
use crate::file::ignore::{IgnoreCache, IgnoreFilter};
use crate::file::resolver::{PathValidator, ValidatedPath};
use crate::file::types::{
    display_name, DirectoryListing, EntryKind, FileContent, FileInfo, OperationResult,
    SearchResults, TreeNode,
};
use crate::file::walk;
use crate::settings::Settings;

/// Entry point for every file operation. Each call validates its path against
/// the allowed roots before touching the filesystem.
pub struct FileAccessManager {
    validator: PathValidator,
    ignore_cache: IgnoreCache,
    default_max_depth: usize,
}

impl FileAccessManager {
    pub fn new(roots: Vec<PathBuf>, default_max_depth: usize) -> Self {
        let validator = PathValidator::new(roots);
        for root in validator.roots() {
            info!("Allowed directory: {}", root.display());
        }
        Self {
            validator,
            ignore_cache: IgnoreCache::new(),
            default_max_depth,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::new(
            settings.allowed_directories.clone(),
            settings.default_max_depth,
        ))
    }

    pub fn allowed_directories(&self) -> &[PathBuf] {
        self.validator.roots()
    }

    pub fn default_max_depth(&self) -> usize {
        self.default_max_depth
    }

    pub fn ignore_cache(&self) -> &IgnoreCache {
        &self.ignore_cache
    }

    pub fn resolve(&self, raw: &str) -> Result<ValidatedPath> {
        self.validator.normalize_and_validate(raw)
    }

    pub async fn read_file(&self, file_path: &str) -> Result<FileContent> {
        let path = self.resolve(file_path)?;
        let path = path.as_path();

        if !path.exists() {
            return Err(FsError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(FsError::NotAFile(path.to_path_buf()));
        }

        let bytes = fs::read(path).await.map_err(|e| FsError::FileRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let size = bytes.len() as u64;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        info!("Read file: {} ({} bytes)", path.display(), size);
        Ok(FileContent { content, size })
    }

    /// Creates missing parent directories. I/O failures are reported in the
    /// result, only a disallowed path is an error.
    pub async fn write_file(&self, file_path: &str, content: &str) -> Result<OperationResult> {
        let path = self.resolve(file_path)?.into_path_buf();

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!(?e, "Failed to create parent directories for {}", path.display());
                return Ok(OperationResult::failed(path, e));
            }
        }

        match fs::write(&path, content).await {
            Ok(()) => {
                info!("Wrote file: {} ({} bytes)", path.display(), content.len());
                Ok(OperationResult::ok(path))
            }
            Err(e) => {
                warn!(?e, "Failed to write file {}", path.display());
                Ok(OperationResult::failed(path, e))
            }
        }
    }

    pub async fn list_directory(
        &self,
        directory_path: &str,
        respect_gitignore: bool,
    ) -> Result<DirectoryListing> {
        let dir = self.resolve(directory_path)?;
        let filter = IgnoreFilter::new(&self.ignore_cache, dir.as_path());
        walk::list_directory(&dir, respect_gitignore.then_some(&filter))
    }

    pub async fn directory_tree(
        &self,
        directory_path: &str,
        max_depth: Option<usize>,
        respect_gitignore: bool,
    ) -> Result<TreeNode> {
        let dir = self.resolve(directory_path)?;
        let max_depth = max_depth.unwrap_or(self.default_max_depth);
        let filter = IgnoreFilter::new(&self.ignore_cache, dir.as_path());
        walk::build_tree(
            &dir,
            max_depth,
            &self.validator,
            respect_gitignore.then_some(&filter),
        )
    }

    pub async fn search_files(
        &self,
        directory_path: &str,
        pattern: &str,
        respect_gitignore: bool,
    ) -> Result<SearchResults> {
        let dir = self.resolve(directory_path)?;
        let filter = IgnoreFilter::new(&self.ignore_cache, dir.as_path());
        let matches = walk::search_by_name(&dir, pattern, respect_gitignore.then_some(&filter))?;
        Ok(SearchResults::new(matches))
    }

    pub async fn get_file_info(&self, file_path: &str) -> Result<FileInfo> {
        let path = self.resolve(file_path)?;

        let metadata = match fs::metadata(path.as_path()).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FsError::PathNotFound(path.into_path_buf()));
            }
            Err(e) => {
                return Err(FsError::FileRead {
                    path: path.into_path_buf(),
                    reason: e.to_string(),
                })
            }
        };

        // Checked on the path as given; the canonical form never is a link
        let is_symlink = fs::symlink_metadata(path.lexical())
            .await
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let modified = metadata.modified().map(to_utc).unwrap_or_else(|e| {
            warn!(?e, "No modification time for {}", path.as_path().display());
            to_utc(SystemTime::UNIX_EPOCH)
        });
        let created = metadata.created().ok().map(to_utc);

        debug!("Stat: {}", path.as_path().display());
        Ok(FileInfo {
            name: display_name(path.lexical()),
            path: path.as_path().to_path_buf(),
            kind,
            size: metadata.len(),
            created,
            modified,
            is_symlink,
        })
    }

    /// Creates parents as needed and succeeds when the directory already
    /// exists.
    pub async fn create_directory(&self, directory_path: &str) -> Result<OperationResult> {
        let path = self.resolve(directory_path)?.into_path_buf();

        match fs::create_dir_all(&path).await {
            Ok(()) => {
                info!("Created directory: {}", path.display());
                Ok(OperationResult::ok(path))
            }
            Err(e) => {
                warn!(?e, "Failed to create directory {}", path.display());
                Ok(OperationResult::failed(path, e))
            }
        }
    }

    /// Drops cached ignore rules for one directory, or all of them.
    pub async fn refresh_ignore_cache(&self, directory_path: Option<&str>) -> Result<()> {
        match directory_path {
            Some(raw) => {
                let dir = self.resolve(raw)?;
                self.ignore_cache.invalidate(dir.as_path());
                debug!("Invalidated ignore rules for {}", dir.as_path().display());
            }
            None => {
                self.ignore_cache.clear_all();
                debug!("Cleared all cached ignore rules");
            }
        }
        Ok(())
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
