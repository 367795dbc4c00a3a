use std::path::PathBuf;
use wicket::config::{Config, ConfigError, DEFAULT_BACKLOG};
use wicket::server::Family;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 8000);
    assert_eq!(cfg.server.backlog, DEFAULT_BACKLOG);
    assert_eq!(cfg.server.family, Family::V4);
    assert!(cfg.static_dir.is_none());
    assert_eq!(cfg.max_level(), tracing::Level::INFO);
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
server:
  host: 0.0.0.0
  port: 7000
  backlog: 64
static_dir: ./static
log_level: debug
"#;
    let cfg = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 7000);
    assert_eq!(cfg.server.backlog, 64);
    assert_eq!(cfg.static_dir, Some(PathBuf::from("./static")));
    assert_eq!(cfg.max_level(), tracing::Level::DEBUG);
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str("server:\n  port: 9001\n").unwrap();

    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 9001);
    assert_eq!(cfg.server.backlog, DEFAULT_BACKLOG);
    assert_eq!(cfg.log_level, "info");
}

#[test]
fn test_config_ipv6_family() {
    let cfg = Config::from_yaml_str("server:\n  host: '::1'\n  family: v6\n").unwrap();

    assert_eq!(cfg.server.host, "::1");
    assert_eq!(cfg.server.family, Family::V6);
}

#[test]
fn test_config_invalid_yaml() {
    let result = Config::from_yaml_str("server:\n  port: not-a-port\n");

    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_unknown_log_level_falls_back() {
    let cfg = Config::from_yaml_str("log_level: loud\n").unwrap();

    assert_eq!(cfg.max_level(), tracing::Level::INFO);
}

#[test]
fn test_config_env_overrides() {
    unsafe {
        std::env::remove_var("WICKET_CONFIG");
        std::env::set_var("HOST", "0.0.0.0");
        std::env::set_var("PORT", "3000");
    }
    let cfg = Config::load().unwrap();
    unsafe {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
    }

    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 3000);
}

#[test]
fn test_config_missing_file() {
    let result = Config::from_file(std::path::Path::new("/nonexistent/wicket.yaml"));

    assert!(matches!(result, Err(ConfigError::Io(_))));
}
