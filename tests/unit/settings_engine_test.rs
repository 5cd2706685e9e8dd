//! Unit tests for the SettingsEngine: loading partial and invalid files,
//! single-key updates with range checks, persistence and reset.

use std::fs;

use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;
use urlnav::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use urlnav::types::errors::SettingsError;
use urlnav::types::settings::{AppSettings, DEFAULT_MAX_HTML_BYTES, DEFAULT_PICK_HISTORY};

fn engine_in(dir: &TempDir) -> SettingsEngine {
    SettingsEngine::new(Some(config_path(dir)))
}

fn config_path(dir: &TempDir) -> String {
    dir.path().join("settings.json").to_string_lossy().to_string()
}

// ─── Loading ───

#[test]
fn test_missing_file_loads_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = engine_in(&dir).load().unwrap();

    assert_eq!(settings, AppSettings::default());
    assert_eq!(settings.interchange.max_html_bytes, DEFAULT_MAX_HTML_BYTES);
    assert_eq!(settings.random_pick.max_history, DEFAULT_PICK_HISTORY);
}

/// A file written by an older version, or by hand, names only some values.
#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        config_path(&dir),
        r#"{"library": {"data_file": "/data/my.json"}, "backup": {"keep": 3}}"#,
    )
    .unwrap();

    let settings = engine_in(&dir).load().unwrap();
    assert_eq!(settings.library.data_file.as_deref(), Some("/data/my.json"));
    assert_eq!(settings.backup.keep, 3);
    assert_eq!(settings.backup.min_interval_secs, 24 * 60 * 60);
    assert_eq!(settings.interchange, AppSettings::default().interchange);
    assert_eq!(settings.logging.filter, "info");
}

#[test]
fn test_malformed_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    fs::write(config_path(&dir), "{ invalid json }").unwrap();

    assert!(matches!(
        engine_in(&dir).load(),
        Err(SettingsError::SerializationError(_))
    ));
}

#[test]
fn test_out_of_range_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(config_path(&dir), r#"{"backup": {"keep": 0}}"#).unwrap();

    let mut engine = engine_in(&dir);
    assert_eq!(
        engine.load().unwrap_err(),
        SettingsError::InvalidValue("backup.keep must be at least 1".to_string())
    );
    assert_eq!(engine.get_settings(), &AppSettings::default());
}

// ─── Updates ───

/// A new engine reading the same file sees every update.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine_in(&dir);
        engine
            .set_value("interchange.max_html_bytes", json!(1024))
            .unwrap();
        engine
            .set_value("interchange.json_import_folder", json!("From backup"))
            .unwrap();
        engine.set_value("search.max_results", json!(25)).unwrap();
    }

    let settings = engine_in(&dir).load().unwrap();
    assert_eq!(settings.interchange.max_html_bytes, 1024);
    assert_eq!(settings.interchange.json_import_folder, "From backup");
    assert_eq!(settings.search.max_results, Some(25));
}

#[rstest]
#[case("")]
#[case("interchange")]
#[case("interchange.nope")]
#[case("nope.max_html_bytes")]
#[case("interchange.max_html_bytes.deeper")]
fn test_unknown_keys_are_rejected(#[case] key: &str) {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);

    assert!(matches!(
        engine.set_value(key, json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
}

#[rstest]
#[case("backup.keep", json!("many"))]
#[case("backup.keep", json!(-1))]
#[case("search.case_sensitive", json!("yes"))]
fn test_wrong_types_are_rejected(#[case] key: &str, #[case] value: serde_json::Value) {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);

    assert!(matches!(
        engine.set_value(key, value),
        Err(SettingsError::InvalidValue(_))
    ));
    assert_eq!(engine.get_settings(), &AppSettings::default());
}

#[rstest]
#[case("interchange.max_html_bytes", json!(0), "interchange.max_html_bytes must be greater than 0")]
#[case("interchange.html_import_folder", json!("  "), "interchange.html_import_folder cannot be empty")]
#[case("interchange.json_import_folder", json!(""), "interchange.json_import_folder cannot be empty")]
#[case("backup.keep", json!(0), "backup.keep must be at least 1")]
#[case("backup.min_interval_secs", json!(-5), "backup.min_interval_secs cannot be negative")]
#[case("search.max_results", json!(0), "search.max_results must be greater than 0 or null")]
#[case("random_pick.max_history", json!(0), "random_pick.max_history must be at least 1")]
#[case("logging.filter", json!(""), "logging.filter cannot be empty")]
fn test_out_of_range_values_are_rejected(
    #[case] key: &str,
    #[case] value: serde_json::Value,
    #[case] message: &str,
) {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);

    assert_eq!(
        engine.set_value(key, value).unwrap_err(),
        SettingsError::InvalidValue(message.to_string())
    );
    assert_eq!(engine.get_settings(), &AppSettings::default());
    assert!(!std::path::Path::new(engine.get_config_path()).exists());
}

// ─── Reset and save ───

#[test]
fn test_reset_restores_defaults_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);
    engine.set_value("logging.filter", json!("debug")).unwrap();

    engine.reset().unwrap();
    assert_eq!(engine.get_settings(), &AppSettings::default());
    assert_eq!(engine_in(&dir).load().unwrap(), AppSettings::default());
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/deeper/settings.json");
    let engine = SettingsEngine::new(Some(path.to_string_lossy().to_string()));

    engine.save().unwrap();
    assert!(path.exists());
    assert_eq!(engine.get_config_path(), path.to_string_lossy());
}
