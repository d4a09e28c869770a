use camino::Utf8PathBuf;
use serde_json::json;

use crate::Config;

fn temp_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("temp dirs are utf-8")
}

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.bundle_url, None);
    assert_eq!(cfg.app_key, "App");
    assert_eq!(cfg.initial_props, json!({}));
    assert_eq!(cfg.rendezvous_delay_ms, 200);
    assert_eq!(cfg.plugins, vec!["ScrollView", "Navigator", "Page"]);
    assert_eq!(cfg.path(), "batchbridge.json");
}

#[test]
fn test_missing_fields_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "batchbridge.json");
    std::fs::write(
        &path,
        r#"{ "bundle_url": "http://localhost:8081/index.bundle", "plugins": [] }"#,
    )
    .unwrap();

    let cfg = Config::load(&path).unwrap();
    assert_eq!(
        cfg.bundle_url.as_ref().map(url::Url::as_str),
        Some("http://localhost:8081/index.bundle")
    );
    assert_eq!(cfg.app_key, "App");
    assert!(cfg.plugins.is_empty());
    assert_eq!(cfg.path(), path.as_path());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "nested/batchbridge.json");

    let mut cfg = Config::default().with_path(&path);
    cfg.app_key = "Gallery".into();
    cfg.initial_props = json!({"theme": "dark"});
    cfg.rendezvous_delay_ms = 0;
    cfg.save().unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, cfg);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw.get("path").is_none(), "path is not persisted");
    assert!(raw.get("bundle_url").is_none(), "unset url is omitted");
}

#[test]
fn test_load_errors_carry_context() {
    let dir = tempfile::tempdir().unwrap();

    let missing = temp_path(&dir, "nope.json");
    let err = Config::load(&missing).unwrap_err();
    assert!(err.to_string().starts_with("Failed to read config file"));

    let broken = temp_path(&dir, "broken.json");
    std::fs::write(&broken, r#"{ "bundle_url": "not a url" }"#).unwrap();
    let err = Config::load(&broken).unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse config file"));
}
