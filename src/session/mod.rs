//! Widget sessions.
//!
//! Every mounted chat widget gets a [`ChatSession`]: a session identifier,
//! the active text direction, and an append-only message history that lives
//! only in memory. Sessions are kept in a [`SessionStore`] until the widget
//! is unmounted or sits idle too long.
//!
//! # Example
//!
//! ```rust
//! use mandaleen_chat::locale::Direction;
//! use mandaleen_chat::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let session = store.create(Direction::Ltr, "Hi! How can I help?");
//!
//! let messages = session.messages();
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].content, "Hi! How can I help?");
//! ```

mod id;
mod thread;

pub use id::SessionId;
pub use thread::{
    ChatMessage, ChatSession, DEFAULT_SESSION_TIMEOUT, Exchange, SendError, Sender, SessionStore,
};
