use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::FsError;

pub const ALLOWED_DIRECTORIES_ENV: &str = "ALLOWED_DIRECTORIES";
pub const DEFAULT_MAX_DEPTH_ENV: &str = "DEFAULT_MAX_DEPTH";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

fn default_max_depth() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_server_name() -> String {
    "filesystem-gitignore".to_string()
}

/// Server settings. Loaded from an optional TOML file, then the environment,
/// then command line overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Directories outside of which no operation may act.
    #[serde(default)]
    pub allowed_directories: Vec<PathBuf>,

    /// Depth limit used by directory_tree when the caller gives none.
    #[serde(default = "default_max_depth")]
    pub default_max_depth: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Name reported to MCP clients.
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowed_directories: Vec::new(),
            default_max_depth: default_max_depth(),
            log_level: default_log_level(),
            server_name: default_server_name(),
        }
    }
}

impl Settings {
    /// Default config file location (~/.config/fsgate/config.toml)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fsgate").join("config.toml"))
    }

    /// Load settings from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {path:?}"))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse settings in {path:?}"))
    }

    /// Load the default config file if one exists, otherwise defaults.
    pub fn load_default() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// `ALLOWED_DIRECTORIES` is split with the platform path separator (`:` on
    /// unix, `;` on windows). Blank segments are dropped.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dirs) = lookup(ALLOWED_DIRECTORIES_ENV) {
            let parsed = parse_directory_list(&dirs);
            if !parsed.is_empty() {
                self.allowed_directories = parsed;
            }
        }

        if let Some(depth) = lookup(DEFAULT_MAX_DEPTH_ENV) {
            match depth.trim().parse::<usize>() {
                Ok(depth) => self.default_max_depth = depth,
                Err(_) => tracing::warn!(
                    "Invalid {DEFAULT_MAX_DEPTH_ENV} '{depth}', keeping {}",
                    self.default_max_depth
                ),
            }
        }

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
    }

    /// Fails when no allowed directory is configured.
    pub fn validate(&self) -> std::result::Result<(), FsError> {
        if self.allowed_directories.is_empty() {
            return Err(FsError::InvalidConfig(format!(
                "{ALLOWED_DIRECTORIES_ENV} must be set. Example: {ALLOWED_DIRECTORIES_ENV}={}",
                example_directory_list()
            )));
        }
        Ok(())
    }

    /// The log level as a tracing filter directive, `None` when unrecognized.
    pub fn log_level_directive(&self) -> Option<&'static str> {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some("trace"),
            "debug" => Some("debug"),
            "info" => Some("info"),
            "warn" | "warning" => Some("warn"),
            "error" | "critical" => Some("error"),
            _ => None,
        }
    }

    /// Like [`Self::log_level_directive`], falling back to `info`.
    pub fn log_filter(&self) -> &'static str {
        self.log_level_directive().unwrap_or("info")
    }
}

pub fn parse_directory_list(value: &str) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
        .map(|p| PathBuf::from(p.to_string_lossy().trim()))
        .collect()
}

fn example_directory_list() -> &'static str {
    if cfg!(windows) {
        r"C:\Projects;C:\Documents"
    } else {
        "/home/me/projects:/home/me/documents"
    }
}
