//! Application configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. Config file: `--config`/`CONFIG_FILE`, or `./config.yaml` if present
//! 3. `MANDALEEN_` environment variables, e.g. `MANDALEEN_WEBHOOK__URL`
//! 4. CLI flags (and the plain env vars clap maps to them, e.g. `PORT`)

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::dispatch::{DEFAULT_TIMEOUT, DEFAULT_WEBHOOK_URL};
use crate::session::DEFAULT_SESSION_TIMEOUT;
use crate::ui::{WidgetConfig, WidgetPosition};

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Webhook endpoint that produces replies
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Seconds to wait for a webhook reply
    #[arg(long, env = "WEBHOOK_TIMEOUT_SECS")]
    pub webhook_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub widget: WidgetSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Idle time after which a mounted widget session is dropped.
    pub session_idle_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetSettings {
    pub brand_name: String,
    pub welcome_message: String,
    pub placeholder: String,
    pub position: WidgetPosition,
    pub enable_rtl_toggle: bool,
}

impl WebhookConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServerConfig {
    #[must_use]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

impl From<WidgetSettings> for WidgetConfig {
    fn from(s: WidgetSettings) -> Self {
        Self {
            brand_name: s.brand_name,
            welcome_message: s.welcome_message,
            placeholder: s.placeholder,
            position: s.position,
            enable_rtl_toggle: s.enable_rtl_toggle,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let widget = WidgetConfig::default();
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.session_idle_secs", DEFAULT_SESSION_TIMEOUT.as_secs())?
            .set_default("webhook.url", DEFAULT_WEBHOOK_URL)?
            .set_default("webhook.timeout_secs", DEFAULT_TIMEOUT.as_secs())?
            .set_default("widget.brand_name", widget.brand_name)?
            .set_default("widget.welcome_message", widget.welcome_message)?
            .set_default("widget.placeholder", widget.placeholder)?
            .set_default("widget.position", "bottom-right")?
            .set_default("widget.enable_rtl_toggle", widget.enable_rtl_toggle)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(Path::new(path)).required(true)),
            None => builder
                .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false)),
        };

        // E.g. MANDALEEN_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("MANDALEEN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", u64::from(port))?;
        }
        if let Some(url) = cli.webhook_url {
            builder = builder.set_override("webhook.url", url)?;
        }
        if let Some(secs) = cli.webhook_timeout_secs {
            builder = builder.set_override("webhook.timeout_secs", secs)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let url = url::Url::parse(&self.webhook.url).map_err(|e| {
            config::ConfigError::Message(format!(
                "invalid webhook.url {:?}: {e}",
                self.webhook.url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(config::ConfigError::Message(format!(
                "webhook.url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.webhook.timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "webhook.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Widget configuration for the page and API.
    #[must_use]
    pub fn widget_config(&self) -> WidgetConfig {
        self.widget.clone().into()
    }
}
