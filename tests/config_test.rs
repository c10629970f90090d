//! Integration tests for Settings loading.
//!
//! These tests only use a local `.arborist.toml` inside a temp directory.
//! Environment overrides are not exercised here: tests share one process
//! environment and run in parallel.

use std::fs;

use tempfile::TempDir;

use arborist::application::ApplicationError;
use arborist::config::{local_config_path, CascadeMode, Settings};

#[test]
fn given_no_local_config_when_load_then_defaults_with_explicit_data_dir() {
    // Arrange
    let dir = TempDir::new().unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(settings.data_dir, dir.path());
    assert!(settings.listing.page_size >= 1);
}

#[test]
fn given_local_data_dir_setting_when_explicit_dir_given_then_explicit_dir_wins() {
    // Arrange
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "data_dir = \"/somewhere/else\"\n",
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(settings.data_dir, dir.path());
}

#[test]
fn given_reassign_policy_with_target_when_load_then_policy_applies() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = r#"
[cascade]
policy = "reassign"
reassign_to = 42
"#;
    fs::write(local_config_path(dir.path()), local).unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(settings.cascade.policy, CascadeMode::Reassign);
    assert_eq!(settings.cascade.reassign_to, Some(42));
}

#[test]
fn given_zero_page_size_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "[listing]\npage_size = 0\n").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_toml_when_load_then_error_names_file() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "[listing\npage_size = ").unwrap();

    let result = Settings::load(Some(dir.path()));

    match result {
        Err(ApplicationError::Config { message }) => {
            assert!(message.contains(".arborist.toml"), "message: {message}")
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_template_when_written_as_local_config_then_loads_as_defaults() {
    // Arrange: every key in the template is commented out
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), Settings::template()).unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(settings.cascade.policy, CascadeMode::Purge);
}

#[test]
fn given_effective_settings_when_serialized_then_parse_back_identically() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "[listing]\npage_size = 7\ncase_sensitive = false\n",
    )
    .unwrap();
    let settings = Settings::load(Some(dir.path())).unwrap();

    let text = settings.to_toml().unwrap();
    let reparsed: Settings = toml::from_str(&text).unwrap();

    assert_eq!(reparsed, settings);
}
