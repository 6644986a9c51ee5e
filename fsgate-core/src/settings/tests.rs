use std::collections::HashMap;
use std::path::PathBuf;

use crate::settings::config::parse_directory_list;
use crate::settings::Settings;
use tempfile::TempDir;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert!(settings.allowed_directories.is_empty());
    assert_eq!(settings.default_max_depth, 5);
    assert_eq!(settings.server_name, "filesystem-gitignore");
    assert_eq!(settings.log_filter(), "info");
}

#[test]
fn test_load_from_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        "allowed_directories = [\"/srv/projects\"]\ndefault_max_depth = 3\n",
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(
        settings.allowed_directories,
        vec![PathBuf::from("/srv/projects")]
    );
    assert_eq!(settings.default_max_depth, 3);
    assert_eq!(settings.log_level, "info");
}

#[test]
fn test_load_from_invalid_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "default_max_depth = \"deep\"").unwrap();

    let err = Settings::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse settings"));
}

#[test]
fn test_env_overrides_file_values() {
    let mut settings = Settings {
        allowed_directories: vec![PathBuf::from("/from/file")],
        ..Settings::default()
    };

    let joined = std::env::join_paths(["/srv/a", "/srv/b"]).unwrap();
    settings.apply_env_from(lookup(&[
        ("ALLOWED_DIRECTORIES", joined.to_str().unwrap()),
        ("DEFAULT_MAX_DEPTH", "2"),
        ("LOG_LEVEL", "DEBUG"),
    ]));

    assert_eq!(
        settings.allowed_directories,
        vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
    );
    assert_eq!(settings.default_max_depth, 2);
    assert_eq!(settings.log_filter(), "debug");
}

#[test]
fn test_env_invalid_depth_is_ignored() {
    let mut settings = Settings::default();
    settings.apply_env_from(lookup(&[("DEFAULT_MAX_DEPTH", "lots")]));
    assert_eq!(settings.default_max_depth, 5);
}

#[test]
fn test_blank_directory_segments_dropped() {
    let sep = if cfg!(windows) { ";" } else { ":" };
    let value = format!("/srv/a{sep}{sep}  {sep}/srv/b ");
    assert_eq!(
        parse_directory_list(&value),
        vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
    );
}

#[test]
fn test_validate_requires_directories() {
    let err = Settings::default().validate().unwrap_err();
    assert!(err.to_string().contains("ALLOWED_DIRECTORIES must be set"));

    let settings = Settings {
        allowed_directories: vec![PathBuf::from("/srv")],
        ..Settings::default()
    };
    assert!(settings.validate().is_ok());
}

#[test]
fn test_log_level_aliases() {
    let mut settings = Settings::default();
    for (level, expected) in [
        ("warning", "warn"),
        ("CRITICAL", "error"),
        ("trace", "trace"),
        ("verbose", "info"),
    ] {
        settings.log_level = level.to_string();
        assert_eq!(settings.log_filter(), expected, "level {level}");
    }
}

#[test]
fn test_unknown_log_level_reported_as_none() {
    let settings = Settings {
        log_level: "verbose".to_string(),
        ..Settings::default()
    };
    assert_eq!(settings.log_level_directive(), None);
    assert_eq!(settings.log_filter(), "info");

    let settings = Settings {
        log_level: " Warning ".to_string(),
        ..Settings::default()
    };
    assert_eq!(settings.log_level_directive(), Some("warn"));
}
