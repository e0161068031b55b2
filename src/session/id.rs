//! Session identifiers.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the random suffix of a generated identifier.
const SUFFIX_LEN: usize = 9;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque per-widget identifier, `session_<unix-millis>_<suffix>`.
///
/// Generated once when a widget mounts and sent with every webhook request.
/// It is never persisted, so a reload always gets a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new identifier from the current time and a random
    /// base-36 suffix.
    #[must_use]
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        Self(format!("session_{millis}_{}", random_suffix()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn random_suffix() -> String {
    // A v4 UUID carries 122 random bits, plenty for nine base-36 digits.
    let mut n = Uuid::new_v4().as_u128();
    (0..SUFFIX_LEN)
        .map(|_| {
            let digit = (n % 36) as usize;
            n /= 36;
            char::from(BASE36[digit])
        })
        .collect()
}
