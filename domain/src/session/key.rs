//! Session key derivation

use super::clock::Clock;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

const BUCKET_FORMAT: &str = "%Y-%m-%d-%H";
const DEFAULT_PREFIX: &str = "session";

/// Identifier of a persisted session: `{prefix}-{YYYY-MM-DD-HH}`.
///
/// Every call within the same local hour resolves to the same key, so
/// restarting the shell resumes the conversation. A new hour starts a fresh
/// session; older ones stay on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Resolve the key for the current hour of `clock`.
    pub fn resolve(prefix: &str, clock: &dyn Clock) -> Self {
        Self::for_time(prefix, clock.now())
    }

    pub fn for_time(prefix: &str, time: NaiveDateTime) -> Self {
        Self(format!(
            "{}-{}",
            sanitize_prefix(prefix),
            time.format(BUCKET_FORMAT)
        ))
    }

    /// Wrap an existing key string (e.g. a file stem read back from disk).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keys become file names, so only `[A-Za-z0-9_-]` survives.
fn sanitize_prefix(prefix: &str) -> String {
    let cleaned: String = prefix
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        cleaned
    }
}
