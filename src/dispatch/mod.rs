//! Message dispatch to the reply webhook.
//!
//! The [`Dispatcher`] turns one user message into one displayable reply.
//! It makes exactly one outbound `POST` per message, bounded by a deadline,
//! and never fails: every failure mode maps to a fixed string in the
//! active [`Direction`].
//!
//! # Outcomes
//!
//! | Outcome                      | Reply text                      |
//! |------------------------------|---------------------------------|
//! | [`Outcome::Succeeded`]       | extracted reply field           |
//! | [`Outcome::PlainText`]       | raw body, verbatim              |
//! | [`Outcome::MalformedResponse`] | generic acknowledgment        |
//! | [`Outcome::HttpError`]       | connection failure message      |
//! | [`Outcome::NetworkError`]    | connection failure message      |
//! | [`Outcome::TimedOut`]        | timeout message                 |

pub mod extract;

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use thiserror::Error;

use crate::locale::Direction;
use crate::session::SessionId;

use extract::{Normalized, normalize_body};

/// Default deadline for a webhook round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default webhook endpoint.
pub const DEFAULT_WEBHOOK_URL: &str = "https://rd4frqju.rpcld.com/webhook/mandaleen";

/// Everything the dispatcher needs to know about one user message.
#[derive(Debug, Clone)]
pub struct DispatchRequest<'a> {
    /// Trimmed, non-empty user text.
    pub user_message: &'a str,
    /// Session the message belongs to.
    pub session_id: &'a SessionId,
    /// Active direction; selects the fallback language.
    pub direction: Direction,
    /// Brand name forwarded to the webhook.
    pub brand_name: &'a str,
}

/// JSON body sent to the webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload<'a> {
    pub session_id: &'a str,
    pub user_message: &'a str,
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub timestamp: String,
    pub brand_name: &'a str,
    #[serde(rename = "isRTL")]
    pub is_rtl: bool,
}

impl<'a> WebhookPayload<'a> {
    #[must_use]
    pub fn new(req: &DispatchRequest<'a>) -> Self {
        Self {
            session_id: req.session_id.as_str(),
            user_message: req.user_message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            brand_name: req.brand_name,
            is_rtl: req.direction.is_rtl(),
        }
    }
}

/// Terminal state of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A recognized reply field held a string.
    Succeeded,
    /// The body was not JSON; the raw text is the reply.
    PlainText,
    /// The body was empty or had no usable reply field.
    MalformedResponse,
    /// The webhook answered with a non-success status.
    HttpError(u16),
    /// The request could not be sent or the body could not be read.
    NetworkError,
    /// The deadline elapsed and the request was dropped.
    TimedOut,
}

impl Outcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PlainText => "plain_text",
            Self::MalformedResponse => "malformed_response",
            Self::HttpError(_) => "http_error",
            Self::NetworkError => "network_error",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Reply text plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub outcome: Outcome,
}

/// Failures of a single webhook round trip.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The deadline elapsed before the round trip finished.
    #[error("webhook did not respond within {0:?}")]
    Timeout(Duration),

    /// The webhook answered with a non-success status.
    #[error("webhook responded with status {0}")]
    Status(reqwest::StatusCode),

    /// Transport failure while sending or reading the body.
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DispatchError {
    /// Outcome and user-visible text for this failure.
    fn into_reply(self, direction: Direction) -> Reply {
        let strings = direction.strings();
        match self {
            Self::Timeout(_) => Reply {
                text: strings.timeout.to_string(),
                outcome: Outcome::TimedOut,
            },
            Self::Status(status) => Reply {
                text: strings.connection_failure.to_string(),
                outcome: Outcome::HttpError(status.as_u16()),
            },
            Self::Transport(_) => Reply {
                text: strings.connection_failure.to_string(),
                outcome: Outcome::NetworkError,
            },
        }
    }
}

/// Something that can turn a user message into a reply.
///
/// Implementations must always produce a reply; failures are expressed as
/// fallback text, not as errors.
#[async_trait::async_trait]
pub trait MessageDispatcher: Send + Sync + std::fmt::Debug {
    async fn dispatch(&self, req: DispatchRequest<'_>) -> Reply;
}

/// Webhook-backed [`MessageDispatcher`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher for `url` with the given deadline.
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), url, timeout)
    }

    /// Create a dispatcher with a custom reqwest client.
    #[must_use]
    pub fn with_client(http: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One round trip, bounded by the deadline. Dropping the inner future
    /// on timeout cancels the in-flight request.
    async fn round_trip(&self, payload: &WebhookPayload<'_>) -> Result<String, DispatchError> {
        tokio::time::timeout(self.timeout, self.send(payload))
            .await
            .map_err(|_elapsed| DispatchError::Timeout(self.timeout))?
    }

    async fn send(&self, payload: &WebhookPayload<'_>) -> Result<String, DispatchError> {
        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        tracing::debug!(status = %status, "Webhook response received");
        if !status.is_success() {
            return Err(DispatchError::Status(status));
        }

        Ok(resp.text().await?)
    }
}

#[async_trait::async_trait]
impl MessageDispatcher for Dispatcher {
    async fn dispatch(&self, req: DispatchRequest<'_>) -> Reply {
        let payload = WebhookPayload::new(&req);
        tracing::info!(
            name: "webhook.dispatch.started",
            session_id = %req.session_id,
            brand_name = %req.brand_name,
            is_rtl = req.direction.is_rtl(),
            "Sending message to webhook"
        );

        let reply = match self.round_trip(&payload).await {
            Ok(body) => {
                tracing::debug!(body = %body, "Raw webhook response");
                normalized_reply(normalize_body(&body), req.direction)
            }
            Err(e) => {
                tracing::warn!(
                    name: "webhook.dispatch.failed",
                    session_id = %req.session_id,
                    error = %e,
                    "Webhook request failed"
                );
                e.into_reply(req.direction)
            }
        };

        tracing::info!(
            name: "webhook.dispatch.completed",
            session_id = %req.session_id,
            outcome = reply.outcome.as_str(),
            "Webhook dispatch completed"
        );
        reply
    }
}

fn normalized_reply(normalized: Normalized, direction: Direction) -> Reply {
    match normalized {
        Normalized::Reply(text) => Reply {
            text,
            outcome: Outcome::Succeeded,
        },
        Normalized::PlainText(text) => Reply {
            text,
            outcome: Outcome::PlainText,
        },
        Normalized::Missing => {
            tracing::warn!("No usable reply found in webhook response");
            Reply {
                text: direction.strings().acknowledgment.to_string(),
                outcome: Outcome::MalformedResponse,
            }
        }
    }
}
