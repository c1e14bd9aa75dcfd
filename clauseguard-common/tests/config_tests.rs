//! Configuration resolution tests
//!
//! Environment variables are deliberately not exercised here (parallel
//! test runs share the process environment); resolution from an explicit
//! TOML file and the failure modes around it are covered instead.

use clauseguard_common::config::{CliOverrides, Config};
use clauseguard_common::error::Error;
use std::io::Write;

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let mut f = std::fs::File::create(&path).expect("create config file");
    f.write_all(body.as_bytes()).expect("write config file");
    path
}

const FULL_CONFIG: &str = r#"
bind_addr = "127.0.0.1:6000"
database_path = "/tmp/clauseguard-test.db"
identity_base_url = "https://id.example.com"
identity_service_key = "service-key"
analysis_api_key = "sk-test"
analysis_model = "gpt-4o-mini"
analysis_max_retries = 5
billing_webhook_secret = "whsec_test"
billing_secret_key = "sk_live_test"
public_base_url = "https://app.example.com"
"#;

#[test]
fn test_load_from_explicit_toml_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(&dir, FULL_CONFIG);

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let config = Config::load(&cli).expect("load config");

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:6000");
    assert_eq!(config.database_path.to_str().unwrap(), "/tmp/clauseguard-test.db");
    assert_eq!(config.identity.base_url, "https://id.example.com");
    assert_eq!(config.analysis.model, "gpt-4o-mini");
    assert_eq!(config.analysis.max_retries, 5);
    assert_eq!(config.billing.public_base_url, "https://app.example.com");
    assert_eq!(config.billing.signature_tolerance_secs, 300);
}

#[test]
fn test_cli_overrides_beat_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(&dir, FULL_CONFIG);

    let cli = CliOverrides {
        bind_addr: Some("0.0.0.0:7777".to_string()),
        database_path: Some("/tmp/override.db".to_string()),
        config_file: Some(path),
    };
    let config = Config::load(&cli).expect("load config");

    assert_eq!(config.bind_addr.to_string(), "0.0.0.0:7777");
    assert_eq!(config.database_path.to_str().unwrap(), "/tmp/override.db");
}

#[test]
fn test_missing_required_key_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    // No analysis_api_key
    let path = write_config(
        &dir,
        r#"
identity_base_url = "https://id.example.com"
identity_service_key = "service-key"
billing_webhook_secret = "whsec_test"
billing_secret_key = "sk_live_test"
"#,
    );

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let err = Config::load(&cli).expect_err("missing API key must fail");
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("analysis backend API key"));
}

#[test]
fn test_explicit_config_file_must_exist() {
    let cli = CliOverrides {
        config_file: Some("/nonexistent/clauseguard.toml".into()),
        ..Default::default()
    };
    let err = Config::load(&cli).expect_err("missing explicit file must fail");
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_invalid_bind_addr_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        &FULL_CONFIG.replace("127.0.0.1:6000", "not-an-address"),
    );

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let err = Config::load(&cli).expect_err("bad bind addr must fail");
    assert!(err.to_string().contains("Invalid bind address"));
}
