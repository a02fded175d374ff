#![allow(clippy::unwrap_used)]

use ledgergit_config::{Config, ConfigError, ConfigFormat, ConfigLoader, StorageConfig, Validator};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledgergit.toml");
    fs::write(
        &path,
        r#"
[governance]
protected_branch = "main"
min_proposal_balance = 50

[writer]
blob_batch_size = 8
pacing_interval_ms = 100

[consistency]
poll_interval_ms = 500
timeout_ms = 30000

[storage]
backend = "local"
base_path = "/srv/ledgergit/blobs"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.governance.min_proposal_balance, 50);
    assert_eq!(config.writer.blob_batch_size, 8);
    assert_eq!(config.consistency.timeout_ms, 30000);
    match config.storage {
        StorageConfig::Local(local) => assert_eq!(local.base_path, "/srv/ledgergit/blobs"),
        other => panic!("unexpected storage {:?}", other),
    }
}

#[tokio::test]
async fn test_load_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledgergit.json");
    fs::write(&path, r#"{ "author": { "domain": "example.org" } }"#).unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.author.domain, "example.org");
    assert_eq!(config.governance.protected_branch, "main");
}

#[tokio::test]
async fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = ConfigLoader::new()
        .load_file(dir.path().join("absent.toml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[tokio::test]
async fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledgergit.toml");
    fs::write(&path, "[consistency]\npoll_interval_ms = 0\n").unwrap();

    let err = ConfigLoader::new().load_file(&path).await.unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[tokio::test]
async fn test_malformed_toml() {
    let loader = ConfigLoader::new();
    let err = loader
        .load_from_string("[writer\nblob_batch_size = 1", ConfigFormat::Toml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::TomlParseError(_)));
}

#[tokio::test]
async fn test_overrides_are_validated() {
    let mut config = Config::default();
    ConfigLoader::new()
        .apply_overrides(&mut config, |name| {
            (name == "LEDGERGIT_POLL_TIMEOUT_MS").then(|| "10".to_string())
        })
        .unwrap();
    assert_eq!(config.consistency.timeout_ms, 10);
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn test_save_then_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.governance.protected_branch = "release".to_string();
    config.observability.log_format = "json".to_string();
    config.save(dir.path()).unwrap();

    assert!(Config::path_in(dir.path()).exists());
    let loaded = Config::load(dir.path()).await.unwrap();
    assert_eq!(loaded.governance.protected_branch, "release");
    assert_eq!(loaded.observability.log_format, "json");
}
