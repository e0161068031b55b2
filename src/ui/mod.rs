//! Widget markup.
//!
//! Server-rendered HTML for the page that hosts the chat widget, and the
//! fragments the widget script appends as the conversation grows.
//!
//! # Structure
//!
//! - [`widget`]: widget configuration and placement
//! - [`page`]: page shell, message bubbles, typing indicator

pub mod page;
pub mod widget;

pub use page::{fallback_bubble, html_shell, message_bubble, typing_indicator};
pub use widget::{WidgetConfig, WidgetPosition};
