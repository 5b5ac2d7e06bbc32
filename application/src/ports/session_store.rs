//! Session store port
//!
//! Durable, append-only storage of [`SessionRecord`]s keyed by [`SessionKey`].

use agentsh_domain::{SessionKey, SessionRecord, Turn};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while loading or appending a session
#[derive(Error, Debug)]
pub enum SessionStoreError {
    /// The record exists but cannot be trusted. Affects this key only.
    #[error("Session '{key}' is corrupt: {reason}")]
    StorageCorruption { key: SessionKey, reason: String },

    #[error("Session '{key}' I/O error: {source}")]
    Io {
        key: SessionKey,
        #[source]
        source: std::io::Error,
    },
}

impl SessionStoreError {
    pub fn is_corruption(&self) -> bool {
        matches!(self, SessionStoreError::StorageCorruption { .. })
    }

    pub fn key(&self) -> &SessionKey {
        match self {
            SessionStoreError::StorageCorruption { key, .. } | SessionStoreError::Io { key, .. } => {
                key
            }
        }
    }
}

/// Port for session persistence
///
/// `append`/`append_all` return only after the turns are durable; an `Err`
/// means nothing was committed. Appends for the same key are serialised.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record for `key`, or a new empty record if none exists.
    ///
    /// Never creates anything on disk.
    async fn load(&self, key: &SessionKey) -> Result<SessionRecord, SessionStoreError>;

    /// Append several turns as one atomic commit.
    async fn append_all(&self, key: &SessionKey, turns: Vec<Turn>)
    -> Result<(), SessionStoreError>;

    async fn append(&self, key: &SessionKey, turn: Turn) -> Result<(), SessionStoreError> {
        self.append_all(key, vec![turn]).await
    }

    /// Move the record for `key` aside so a fresh session can start.
    ///
    /// Returns `false` when there was nothing to move.
    async fn reset(&self, key: &SessionKey) -> Result<bool, SessionStoreError>;

    /// Keys of all persisted sessions, sorted
    async fn list(&self) -> Result<Vec<SessionKey>, SessionStoreError>;
}
