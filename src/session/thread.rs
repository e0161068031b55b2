//! Chat sessions and session storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::{DispatchRequest, MessageDispatcher};
use crate::locale::Direction;

use super::SessionId;

/// Default idle time after which a session is dropped (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Id of the welcome message every session starts with.
const WELCOME_MESSAGE_ID: u64 = 1;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// A single entry in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Placeholder shown while a reply is pending. Never stored in history.
    #[serde(
        rename = "isTypingPlaceholder",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub typing: bool,
}

impl ChatMessage {
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Messages appended by one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user: ChatMessage,
    pub reply: ChatMessage,
    /// Direction the reply was produced in.
    pub direction: Direction,
}

/// Reasons a send is refused before anything is dispatched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("message is empty")]
    Empty,
    #[error("a message is already being sent")]
    Busy,
}

/// One mounted chat widget.
///
/// Holds the session identifier, the active direction and the append-only
/// message history. At most one send is in flight at a time.
#[derive(Debug, Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: SessionId,
    messages: RwLock<Vec<ChatMessage>>,
    direction: RwLock<Direction>,
    /// Set while a send is outstanding.
    sending: AtomicBool,
    /// Numeric value of the most recently assigned message id.
    last_id: Mutex<u64>,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
}

/// Holds the in-flight flag of a session; clears it when dropped.
///
/// The guard owns a handle to the session so it can move into the task that
/// finishes the send, independent of the caller.
#[derive(Debug)]
struct InFlight(ChatSession);

impl InFlight {
    fn acquire(session: &ChatSession) -> Option<Self> {
        session
            .inner
            .sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(session.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.inner.sending.store(false, Ordering::Release);
    }
}

impl ChatSession {
    /// Mount a new session with a fresh identifier.
    ///
    /// The history starts with one AI welcome message: `welcome_message`
    /// for left-to-right sessions, the fixed Arabic greeting otherwise.
    #[must_use]
    pub fn new(direction: Direction, welcome_message: &str) -> Self {
        Self::with_id(SessionId::generate(), direction, welcome_message)
    }

    /// Mount a session with a specific identifier.
    #[must_use]
    pub fn with_id(id: SessionId, direction: Direction, welcome_message: &str) -> Self {
        let now = Utc::now();
        let welcome = ChatMessage {
            id: WELCOME_MESSAGE_ID.to_string(),
            content: direction
                .strings()
                .welcome
                .unwrap_or(welcome_message)
                .to_string(),
            sender: Sender::Ai,
            timestamp: now,
            typing: false,
        };

        Self {
            inner: Arc::new(SessionInner {
                id,
                messages: RwLock::new(vec![welcome]),
                direction: RwLock::new(direction),
                sending: AtomicBool::new(false),
                last_id: Mutex::new(WELCOME_MESSAGE_ID),
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        *self.inner.direction.read().unwrap()
    }

    /// Switch direction. Affects later sends only; history is untouched.
    pub fn set_direction(&self, direction: Direction) {
        *self.inner.direction.write().unwrap() = direction;
        self.touch();
    }

    /// Flip direction and return the new one.
    pub fn toggle_direction(&self) -> Direction {
        let mut guard = self.inner.direction.write().unwrap();
        *guard = guard.toggled();
        let direction = *guard;
        drop(guard);
        self.touch();
        direction
    }

    /// True while a send is outstanding.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.inner.sending.load(Ordering::Acquire)
    }

    /// Snapshot of the history.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.messages.read().unwrap().clone()
    }

    #[must_use]
    pub fn message(&self, id: &str) -> Option<ChatMessage> {
        self.inner
            .messages
            .read()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.messages.read().unwrap().len()
    }

    /// Typing indicator message for the current direction.
    #[must_use]
    pub fn typing_placeholder(&self) -> ChatMessage {
        ChatMessage {
            id: "typing".to_string(),
            content: self.direction().strings().typing.to_string(),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            typing: true,
        }
    }

    /// Send one user message and append the reply.
    ///
    /// The trimmed text is appended as a user message, dispatched exactly
    /// once, and the reply is appended as an AI message. Both are returned.
    ///
    /// The dispatch and the final append run on their own task, which also
    /// holds the in-flight flag. Dropping the returned future does not stop
    /// them: the reply is still appended and the session stays busy until
    /// it is. If the dispatch itself fails, the locale's unexpected-error
    /// text is appended instead.
    pub async fn send(
        &self,
        text: &str,
        dispatcher: Arc<dyn MessageDispatcher>,
        brand_name: &str,
    ) -> Result<Exchange, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::Empty);
        }
        let in_flight = InFlight::acquire(self).ok_or(SendError::Busy)?;

        let direction = self.direction();
        let user = self.push(Sender::User, text.to_string());
        tracing::debug!(
            session_id = %self.inner.id,
            message_id = %user.id,
            "Appended user message"
        );

        let session = self.clone();
        let user_message = user.content.clone();
        let brand_name = brand_name.to_string();
        let task = tokio::spawn(async move {
            let session_id = session.inner.id.clone();
            let dispatch = tokio::spawn(async move {
                dispatcher
                    .dispatch(DispatchRequest {
                        user_message: &user_message,
                        session_id: &session_id,
                        direction,
                        brand_name: &brand_name,
                    })
                    .await
            });

            let content = match dispatch.await {
                Ok(reply) => reply.text,
                Err(e) => {
                    tracing::error!(
                        session_id = %session.inner.id,
                        error = %e,
                        "Dispatch task failed"
                    );
                    direction.strings().unexpected_error.to_string()
                }
            };
            let reply = session.push(Sender::Ai, content);
            drop(in_flight);
            reply
        });

        let reply = match task.await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    session_id = %self.inner.id,
                    error = %e,
                    "Send task failed"
                );
                self.push(
                    Sender::Ai,
                    direction.strings().unexpected_error.to_string(),
                )
            }
        };

        Ok(Exchange {
            user,
            reply,
            direction,
        })
    }

    fn push(&self, sender: Sender, content: String) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_id().to_string(),
            content,
            sender,
            timestamp: Utc::now(),
            typing: false,
        };
        self.inner.messages.write().unwrap().push(message.clone());
        self.touch();
        message
    }

    /// Millisecond-clock id, bumped past the previous id when the clock has
    /// not moved on.
    fn next_id(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut last = self.inner.last_id.lock().unwrap();
        *last = now.max(*last + 1);
        *last
    }

    fn touch(&self) {
        *self.inner.last_activity.write().unwrap() = Utc::now();
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Check if the session has been idle longer than `timeout`.
    ///
    /// Sessions with a send in flight never expire.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        if self.is_sending() {
            return false;
        }
        let last = *self.inner.last_activity.read().unwrap();
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// Thread-safe in-memory store of mounted widgets.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<SessionId, ChatSession>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Mount a new session and return it.
    #[must_use]
    pub fn create(&self, direction: Direction, welcome_message: &str) -> ChatSession {
        let session = ChatSession::new(direction, welcome_message);
        let mut guard = self.inner.sessions.write().unwrap();
        guard.insert(session.id().clone(), session.clone());
        session
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatSession> {
        let guard = self.inner.sessions.read().unwrap();
        guard.get(&SessionId::from(id.to_string())).cloned()
    }

    /// Unmount a session.
    pub fn remove(&self, id: &str) -> Option<ChatSession> {
        let mut guard = self.inner.sessions.write().unwrap();
        guard.remove(&SessionId::from(id.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been idle longer than `timeout`.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.sessions.write().unwrap();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Outcome, Reply};

    /// Replies with a fixed text, or panics when asked to.
    #[derive(Debug)]
    struct StubDispatcher {
        reply: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl MessageDispatcher for StubDispatcher {
        async fn dispatch(&self, req: DispatchRequest<'_>) -> Reply {
            let Some(text) = self.reply else {
                panic!("stub dispatcher failure");
            };
            Reply {
                text: format!("{text}: {}", req.user_message),
                outcome: Outcome::Succeeded,
            }
        }
    }

    fn stub(reply: &'static str) -> Arc<dyn MessageDispatcher> {
        Arc::new(StubDispatcher { reply: Some(reply) })
    }

    /// Replies after a delay and tracks how many dispatches overlap.
    #[derive(Debug, Default)]
    struct SlowDispatcher {
        delay: Duration,
        calls: std::sync::atomic::AtomicUsize,
        active: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MessageDispatcher for SlowDispatcher {
        async fn dispatch(&self, req: DispatchRequest<'_>) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Reply {
                text: format!("late: {}", req.user_message),
                outcome: Outcome::Succeeded,
            }
        }
    }

    #[test]
    fn test_welcome_message_per_direction() {
        let ltr = ChatSession::new(Direction::Ltr, "Hello there");
        let messages = ltr.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "1");
        assert_eq!(messages[0].sender, Sender::Ai);
        assert_eq!(messages[0].content, "Hello there");

        let rtl = ChatSession::new(Direction::Rtl, "Hello there");
        assert_eq!(
            rtl.messages()[0].content,
            Direction::Rtl.strings().welcome.unwrap()
        );
    }

    #[tokio::test]
    async fn test_send_appends_user_and_reply() {
        let session = ChatSession::new(Direction::Ltr, "hi");
        let exchange = session
            .send("  question  ", stub("answer"), "Mandaleen")
            .await
            .unwrap();
        let reply = exchange.reply;

        assert_eq!(exchange.user.content, "question");
        assert_eq!(exchange.direction, Direction::Ltr);
        assert_eq!(reply.sender, Sender::Ai);
        assert_eq!(reply.content, "answer: question");

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].content, "question");
        assert_eq!(messages[2], reply);
        assert!(!session.is_sending());
    }

    #[tokio::test]
    async fn test_message_ids_increase() {
        let session = ChatSession::new(Direction::Ltr, "hi");
        session.send("one", stub("a"), "b").await.unwrap();
        session.send("two", stub("a"), "b").await.unwrap();

        let ids: Vec<u64> = session
            .messages()
            .iter()
            .map(|m| m.id.parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let session = ChatSession::new(Direction::Ltr, "hi");
        let err = session.send("   \n", stub("x"), "b").await.unwrap_err();
        assert_eq!(err, SendError::Empty);
        assert_eq!(session.message_count(), 1);
    }

    #[tokio::test]
    async fn test_busy_while_in_flight() {
        let session = ChatSession::new(Direction::Ltr, "hi");
        let guard = InFlight::acquire(&session).unwrap();

        let err = session.send("hello", stub("x"), "b").await.unwrap_err();
        assert_eq!(err, SendError::Busy);
        assert_eq!(session.message_count(), 1);

        drop(guard);
        assert!(session.send("hello", stub("x"), "b").await.is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_send_still_completes() {
        let session = ChatSession::new(Direction::Ltr, "hi");
        let slow = Arc::new(SlowDispatcher {
            delay: Duration::from_millis(300),
            ..SlowDispatcher::default()
        });
        let dispatcher: Arc<dyn MessageDispatcher> = slow.clone();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            session.send("one", Arc::clone(&dispatcher), "b"),
        )
        .await;
        assert!(abandoned.is_err());

        // The first dispatch still owns the session.
        assert!(session.is_sending());
        let err = session
            .send("two", Arc::clone(&dispatcher), "b")
            .await
            .unwrap_err();
        assert_eq!(err, SendError::Busy);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!session.is_sending());
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "one");
        assert_eq!(messages[2].sender, Sender::Ai);
        assert_eq!(messages[2].content, "late: one");

        session.send("two", dispatcher, "b").await.unwrap();
        assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
        assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
        assert_eq!(session.message_count(), 5);
    }

    #[tokio::test]
    async fn test_dispatch_panic_becomes_unexpected_error() {
        let session = ChatSession::new(Direction::Rtl, "hi");
        let failing: Arc<dyn MessageDispatcher> = Arc::new(StubDispatcher { reply: None });

        let exchange = session.send("hello", failing, "b").await.unwrap();
        assert_eq!(exchange.reply.content, Direction::Rtl.strings().unexpected_error);
        assert!(!session.is_sending());
    }

    #[test]
    fn test_toggle_direction() {
        let session = ChatSession::new(Direction::Ltr, "hi");
        assert_eq!(session.toggle_direction(), Direction::Rtl);
        assert_eq!(session.direction(), Direction::Rtl);
        session.set_direction(Direction::Ltr);
        assert_eq!(session.direction(), Direction::Ltr);
        // History is not rewritten.
        assert_eq!(session.messages()[0].content, "hi");
    }

    #[test]
    fn test_typing_placeholder() {
        let session = ChatSession::new(Direction::Rtl, "hi");
        let typing = session.typing_placeholder();
        assert!(typing.typing);
        assert_eq!(typing.content, Direction::Rtl.strings().typing);
        assert_eq!(session.message_count(), 1);
    }

    #[test]
    fn test_session_store() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let session = store.create(Direction::Ltr, "hi");
        assert_eq!(store.len(), 1);

        let retrieved = store.get(session.id().as_str()).unwrap();
        assert_eq!(retrieved.id(), session.id());

        store.remove(session.id().as_str());
        assert!(store.is_empty());
        assert!(store.get(session.id().as_str()).is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = SessionStore::new();
        let _session = store.create(Direction::Ltr, "hi");

        assert_eq!(store.cleanup_expired_with_timeout(DEFAULT_SESSION_TIMEOUT), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_millis(5)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_message_serialization() {
        let session = ChatSession::new(Direction::Ltr, "hi");
        let value = serde_json::to_value(&session.messages()[0]).unwrap();
        assert_eq!(value["sender"], "ai");
        assert_eq!(value["id"], "1");
        assert!(value.get("isTypingPlaceholder").is_none());

        let value = serde_json::to_value(session.typing_placeholder()).unwrap();
        assert_eq!(value["isTypingPlaceholder"], true);
    }
}
