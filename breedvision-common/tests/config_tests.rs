//! Configuration loading and root folder resolution
//!
//! Tests touching BREEDVISION_* environment variables are marked #[serial]
//! so they never run concurrently with each other.

use breedvision_common::config::{
    load_or_default, load_toml_config, resolve_root_folder, write_toml_config, TomlConfig,
    CONFIG_FILE_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_env_overrides_toml_root_folder() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/env"));

    // CLI still wins over both
    assert_eq!(
        resolve_root_folder(Some(Path::new("/from/cli")), &config),
        PathBuf::from("/from/cli")
    );

    std::env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    std::env::set_var(ROOT_FOLDER_ENV, "   ");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));
    std::env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_fallback_to_compiled_default() {
    std::env::remove_var(ROOT_FOLDER_ENV);
    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert!(resolved.ends_with("breedvision") || resolved.ends_with("breedvision_data"));
}

#[test]
fn test_write_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig::default();
    config.locale.default_locale = "hi".to_string();
    config.analysis.endpoint = Some("http://localhost:8080/classify".to_string());
    config.auth.min_password_length = 8;

    write_toml_config(&config, &path).unwrap();
    assert_eq!(load_toml_config(&path).unwrap(), config);
}

#[test]
fn test_invalid_file_degrades_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "event_capacity = 0\n").unwrap();

    assert!(load_toml_config(&path).is_err());
    assert_eq!(load_or_default(Some(path.as_path())), TomlConfig::default());
}

#[test]
#[serial]
fn test_config_file_from_env() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[analysis]\ntimeout_ms = 1500\n").unwrap();

    std::env::set_var(CONFIG_FILE_ENV, &path);
    let config = load_or_default(None);
    std::env::remove_var(CONFIG_FILE_ENV);

    assert_eq!(config.analysis.timeout_ms, 1500);
    assert_eq!(config.analysis.simulated_delay_ms, 3000);
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");
    assert_eq!(load_or_default(Some(path.as_path())), TomlConfig::default());
}
