//! Unit tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate PATHWAYS_CONFIG or PATHWAYS_OUTPUT_FOLDER are marked
//! with #[serial] to ensure they run sequentially, not in parallel.

use pathways_common::config::{
    load_or_default, load_toml_config, resolve_config_path, write_toml_config,
    ImportTomlConfig, LoggingConfig, OutputFolderResolver, TomlConfig, CONFIG_ENV_VAR,
    OUTPUT_FOLDER_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Output folder resolution
// ============================================================================

#[test]
#[serial]
fn test_cli_argument_overrides_env_and_toml() {
    env::set_var(OUTPUT_FOLDER_ENV_VAR, "/from/env");

    let resolver = OutputFolderResolver::new(
        Some(PathBuf::from("/from/cli")),
        Some(PathBuf::from("/from/toml")),
    );
    assert_eq!(resolver.resolve(), PathBuf::from("/from/cli"));

    env::remove_var(OUTPUT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    env::set_var(OUTPUT_FOLDER_ENV_VAR, "/from/env");

    let resolver = OutputFolderResolver::new(None, Some(PathBuf::from("/from/toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/from/env"));

    env::remove_var(OUTPUT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_used_when_no_cli_or_env() {
    env::remove_var(OUTPUT_FOLDER_ENV_VAR);

    let resolver = OutputFolderResolver::new(None, Some(PathBuf::from("/from/toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_default_output_folder_is_not_empty() {
    env::remove_var(OUTPUT_FOLDER_ENV_VAR);

    let resolved = OutputFolderResolver::default().resolve();
    assert!(!resolved.as_os_str().is_empty());
}

// ============================================================================
// Config file discovery and loading
// ============================================================================

#[test]
#[serial]
fn test_config_path_from_env() {
    env::set_var(CONFIG_ENV_VAR, "/etc/pathways/custom.toml");

    assert_eq!(
        resolve_config_path(None),
        Some(PathBuf::from("/etc/pathways/custom.toml"))
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_config_path_cli_wins() {
    env::set_var(CONFIG_ENV_VAR, "/etc/pathways/custom.toml");

    let cli = PathBuf::from("./local.toml");
    assert_eq!(resolve_config_path(Some(&cli)), Some(cli.clone()));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let config = load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_unparsable_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "this is [not toml").unwrap();

    assert!(load_toml_config(&path).is_err());
    assert!(load_or_default(Some(&path)).is_err());
}

#[test]
fn test_write_then_load_preserves_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("import.toml");

    let config = TomlConfig {
        output_folder: Some(PathBuf::from("/srv/out")),
        logging: LoggingConfig {
            level: "warn".to_string(),
            file: None,
        },
        import: ImportTomlConfig {
            dialect: Some("legacy-csv".to_string()),
            phone_dedup: Some("location".to_string()),
            ..Default::default()
        },
    };

    write_toml_config(&config, &path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists());
    assert_eq!(load_toml_config(&path).unwrap(), config);
}
