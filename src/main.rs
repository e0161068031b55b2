//! Mandaleen chat widget server.
//!
//! Entry point: loads configuration, initializes logging and serves the
//! widget page and API.

use std::sync::Arc;

use dotenvy::dotenv;
use mimalloc::MiMalloc;

use mandaleen_chat::{config::AppConfig, server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    telemetry::init();

    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    server::start_server(config).await
}
