//! Integration tests for ConfigService
//!
//! Settings persistence uses an isolated temporary directory so the tests
//! never touch the real platform config dir.

use remote_code_launcher::models::BootstrapConfig;
use remote_code_launcher::services::config_service::{ConfigService, LauncherSettings};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_defaults_when_no_file_exists() {
    let dir = tempdir().unwrap();
    let service = ConfigService::with_dir(dir.path().to_path_buf()).unwrap();

    let settings = service.load_settings().unwrap();
    assert_eq!(
        settings.bootstrap.commit_id,
        "af28b32d7e553898b2a91af498b1fb666fdebe0c"
    );
    assert_eq!(settings.bootstrap.arch, "x64");
    assert_eq!(settings.bootstrap.local_port, 8080);
}

#[test]
fn test_save_then_load_roundtrip() {
    let dir = tempdir().unwrap();
    let service = ConfigService::with_dir(dir.path().to_path_buf()).unwrap();

    let settings = LauncherSettings {
        bootstrap: BootstrapConfig::default()
            .with_commit_id("abc123")
            .with_arch("arm64")
            .with_install_path("/opt/code-server")
            .with_local_port(9090),
    };

    service.save_settings(&settings).unwrap();

    let loaded = service.load_settings().unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let service = ConfigService::with_dir(dir.path().to_path_buf()).unwrap();

    fs::write(
        dir.path().join("launcher.toml"),
        "[bootstrap]\narch = \"arm64\"\n",
    )
    .unwrap();

    let settings = service.load_settings().unwrap();
    assert_eq!(settings.bootstrap.arch, "arm64");
    assert_eq!(
        settings.bootstrap.commit_id,
        "af28b32d7e553898b2a91af498b1fb666fdebe0c"
    );
    assert_eq!(settings.bootstrap.local_port, 8080);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let service = ConfigService::with_dir(dir.path().to_path_buf()).unwrap();

    fs::write(dir.path().join("launcher.toml"), "bootstrap = [").unwrap();
    assert!(service.load_settings().is_err());
}

#[test]
fn test_settings_file_never_contains_credentials() {
    let dir = tempdir().unwrap();
    let service = ConfigService::with_dir(dir.path().to_path_buf()).unwrap();

    service
        .save_settings(&LauncherSettings::default())
        .unwrap();

    let content = fs::read_to_string(dir.path().join("launcher.toml")).unwrap();
    assert!(!content.contains("password"));
    assert!(!content.contains("username"));
    assert!(!content.contains("host"));
}
