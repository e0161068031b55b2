use mandaleen_chat::config::AppConfig;
use mandaleen_chat::dispatch::DEFAULT_WEBHOOK_URL;
use mandaleen_chat::ui::WidgetPosition;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;

const BIN: &str = "mandaleen-chat";

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        for var in [
            "MANDALEEN_SERVER__PORT",
            "MANDALEEN_WEBHOOK__URL",
            "MANDALEEN_WEBHOOK__TIMEOUT_SECS",
            "MANDALEEN_WIDGET__BRAND_NAME",
            "CONFIG_FILE",
            "HOST",
            "PORT",
            "WEBHOOK_URL",
            "WEBHOOK_TIMEOUT_SECS",
        ] {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args([BIN]).expect("defaults should load");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.session_idle_secs, 30 * 60);
    assert_eq!(config.webhook.url, DEFAULT_WEBHOOK_URL);
    assert_eq!(config.webhook.timeout_secs, 30);

    let widget = config.widget_config();
    assert_eq!(widget.brand_name, "Mandaleen");
    assert_eq!(widget.position, WidgetPosition::BottomRight);
    assert!(widget.enable_rtl_toggle);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("MANDALEEN_SERVER__PORT", "9090");
        env::set_var("MANDALEEN_WIDGET__BRAND_NAME", "Acme");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.widget.brand_name, "Acme");

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    write!(
        file,
        r#"
server:
  port: 7070
webhook:
  url: "http://localhost:5678/webhook/chat"
  timeout_secs: 5
widget:
  position: top-left
  enable_rtl_toggle: false
"#
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let config =
        AppConfig::load_from_args([BIN, "--config", &path]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.webhook.url, "http://localhost:5678/webhook/chat");
    assert_eq!(config.webhook.timeout().as_secs(), 5);
    assert_eq!(config.widget.position, WidgetPosition::TopLeft);
    assert!(!config.widget.enable_rtl_toggle);
    // Unset keys keep their defaults.
    assert_eq!(config.widget.brand_name, "Mandaleen");
}

#[test]
#[serial]
fn test_missing_explicit_file_fails() {
    clear_env_vars();
    let result = AppConfig::load_from_args([BIN, "--config", "does-not-exist.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("MANDALEEN_WEBHOOK__URL", "http://from-env.example/hook");
        env::set_var("MANDALEEN_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args([
        BIN,
        "--webhook-url",
        "https://from-cli.example/hook",
        "--port",
        "4000",
        "--webhook-timeout-secs",
        "12",
    ])
    .expect("Failed to load config");
    assert_eq!(config.webhook.url, "https://from-cli.example/hook");
    assert_eq!(config.server.port, 4000);
    assert_eq!(config.webhook.timeout_secs, 12);

    clear_env_vars();
}

#[test]
#[serial]
fn test_plain_env_vars_map_to_flags() {
    clear_env_vars();
    unsafe {
        env::set_var("WEBHOOK_URL", "http://plain-env.example/hook");
        env::set_var("PORT", "5050");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.webhook.url, "http://plain-env.example/hook");
    assert_eq!(config.server.port, 5050);

    clear_env_vars();
}

#[test]
#[serial]
fn test_invalid_webhook_rejected() {
    clear_env_vars();

    let err = AppConfig::load_from_args([BIN, "--webhook-url", "not a url"]).unwrap_err();
    assert!(err.to_string().contains("webhook.url"));

    let err = AppConfig::load_from_args([BIN, "--webhook-url", "ftp://example.com/hook"]).unwrap_err();
    assert!(err.to_string().contains("http or https"));

    let err = AppConfig::load_from_args([BIN, "--webhook-timeout-secs", "0"]).unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    // Create ./config.yaml
    let config_content = r#"
server:
  port: 6060
    "#;
    let cwd_path = "config.yaml";
    fs::write(cwd_path, config_content).expect("Failed to write ./config.yaml");

    let config = AppConfig::load_from_args([BIN]);

    fs::remove_file(cwd_path).unwrap();

    assert_eq!(config.expect("Failed to load config").server.port, 6060);
}
