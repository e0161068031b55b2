//! Mandaleen chat widget service
//!
//! Hosts the chat widget of the Mandaleen AI customer-service site. Each
//! user message is forwarded to an external webhook and whatever text comes
//! back is rendered in the widget, in English (left-to-right) or Arabic
//! (right-to-left).
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server for the page and the widget API
//! - **Dispatch**: one bounded webhook round trip per message, with reply
//!   normalization and per-locale fallbacks
//! - **Sessions**: in-memory, append-only chat history per mounted widget
//! - **UI**: server-rendered HTML fragments and a Markdown subset renderer
//!
//! # Modules
//!
//! - [`dispatch`]: webhook dispatcher and reply extraction
//! - [`locale`]: text direction and fixed strings
//! - [`markdown`]: Markdown subset renderer
//! - [`session`]: widget sessions and the session store
//! - [`ui`]: widget configuration and markup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod dispatch;
pub mod locale;
pub mod markdown;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod ui;

use std::sync::Arc;

use dispatch::MessageDispatcher;
use session::SessionStore;
use ui::WidgetConfig;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Widget configuration served to the page.
    pub widget: Arc<WidgetConfig>,
    /// Mounted widget sessions.
    pub sessions: SessionStore,
    /// Turns user messages into replies.
    pub dispatcher: Arc<dyn MessageDispatcher>,
}

impl AppState {
    #[must_use]
    pub fn new(
        widget: WidgetConfig,
        sessions: SessionStore,
        dispatcher: Arc<dyn MessageDispatcher>,
    ) -> Self {
        Self {
            widget: Arc::new(widget),
            sessions,
            dispatcher,
        }
    }
}
