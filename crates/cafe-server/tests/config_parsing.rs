use std::{env, fs, time::Duration};

use cafe_server::StorageBackend;
use cafe_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("cafe.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
request_timeout_ms = 1000
body_limit_bytes = 1024

[storage]
backend = "memory"

[cache]
enabled = true
ttl = "10m"

[cities]
case_insensitive = true

[auth]
access_token_lifetime = "1m"

[auth.signing]
algorithm = "HS256"
secret = "test-secret"

[logging]
level = "debug"

[bootstrap]
categories = ["Coffee", "Wifi"]

[bootstrap.admin_user]
username = "admin"
password = "admin-password"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.cache.ttl, Duration::from_secs(600));
    assert!(cfg.cities.case_insensitive);
    assert_eq!(cfg.auth.access_token_lifetime, Duration::from_secs(60));
    assert_eq!(cfg.auth.signing.secret, "test-secret");
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");
    assert_eq!(cfg.bootstrap.categories.len(), 2);
    assert_eq!(cfg.bootstrap.admin_user.unwrap().username, "admin");

    // 2) Env override should win over file
    unsafe {
        env::set_var("CAFE__SERVER__PORT", "9090");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.server.port, 9090);
    // cleanup env var
    unsafe {
        env::remove_var("CAFE__SERVER__PORT");
    }

    // 3) Invalid config (postgres without url) should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[storage]
backend = "postgres"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("storage.postgres.url"));

    // 4) An explicit path that does not exist is an error
    let missing = dir.path().join("missing.toml");
    let err = load_config(missing.to_str()).expect_err("expected missing file error");
    assert!(err.contains("not found"));
}
