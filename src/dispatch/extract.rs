//! Reply extraction from webhook response bodies.
//!
//! The webhook does not have a fixed response schema. Replies have been seen
//! as a bare object or as an array of objects (only the first is used), with
//! the text under one of several field names. Extraction is an ordered list
//! of [`ExtractionRule`]s; the first rule that finds a present value decides
//! the result.

use serde_json::{Map, Value};

/// Field names probed for the reply text, in priority order.
pub const REPLY_FIELDS: [&str; 7] = [
    "output",
    "aiResponse",
    "response",
    "message",
    "reply",
    "text",
    "content",
];

/// One step of reply extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Look up a top-level field of the reply object.
    Field(&'static str),
}

/// Extraction rules in the order they are applied.
pub const RULES: [ExtractionRule; 7] = [
    ExtractionRule::Field(REPLY_FIELDS[0]),
    ExtractionRule::Field(REPLY_FIELDS[1]),
    ExtractionRule::Field(REPLY_FIELDS[2]),
    ExtractionRule::Field(REPLY_FIELDS[3]),
    ExtractionRule::Field(REPLY_FIELDS[4]),
    ExtractionRule::Field(REPLY_FIELDS[5]),
    ExtractionRule::Field(REPLY_FIELDS[6]),
];

impl ExtractionRule {
    /// Returns the value this rule selects, or `None` to fall through to
    /// the next rule.
    ///
    /// Missing fields and "empty" values (`null`, `false`, `0`, `""`) fall
    /// through. Anything else is selected, even if it is not a string.
    #[must_use]
    pub fn probe<'a>(&self, object: &'a Map<String, Value>) -> Option<&'a Value> {
        match self {
            Self::Field(name) => object.get(*name).filter(|v| is_present(v)),
        }
    }
}

/// Result of normalizing a raw response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// A reply field held a string.
    Reply(String),
    /// The body was not JSON and is used as the reply verbatim.
    PlainText(String),
    /// Nothing usable: empty body, unexpected shape, no recognized field,
    /// or a recognized field holding a non-string value.
    Missing,
}

/// Normalize a raw webhook response body into reply text.
///
/// ```rust
/// use mandaleen_chat::dispatch::extract::{normalize_body, Normalized};
///
/// assert_eq!(
///     normalize_body(r#"[{"message":"hi"},{"message":"ignored"}]"#),
///     Normalized::Reply("hi".to_string())
/// );
/// assert_eq!(
///     normalize_body("plain text reply"),
///     Normalized::PlainText("plain text reply".to_string())
/// );
/// ```
#[must_use]
pub fn normalize_body(body: &str) -> Normalized {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "Webhook response is not JSON, using raw text");
            return if body.is_empty() {
                Normalized::Missing
            } else {
                Normalized::PlainText(body.to_string())
            };
        }
    };

    reply_object(&value)
        .and_then(extract)
        .map_or(Normalized::Missing, Normalized::Reply)
}

/// The object replies are looked up in: the first element of an array, or
/// the value itself when it is an object.
fn reply_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.first().and_then(Value::as_object),
        Value::Object(object) => Some(object),
        _ => None,
    }
}

/// Apply [`RULES`] in order; the first selected value is the reply if it is
/// a string.
fn extract(object: &Map<String, Value>) -> Option<String> {
    let selected = RULES.iter().find_map(|rule| rule.probe(object))?;
    selected.as_str().map(ToString::to_string)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
