//! Error types for the aggregation core and its state store

use thiserror::Error;

/// Failures talking to the remote key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The store's response envelope could not be read.
    #[error("unreadable store response: {0}")]
    Decode(String),
}

/// Errors surfaced by the aggregation engine and feeds
#[derive(Debug, Error)]
pub enum FeedError {
    /// A non-empty persisted blob is not a valid aggregation record.
    ///
    /// Absent data is never an error; this variant only covers corruption.
    #[error("corrupt aggregation state under `{key}`: {source}")]
    CorruptState {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The state record could not be encoded for persistence.
    #[error("failed to encode aggregation state: {0}")]
    Encode(#[source] serde_json::Error),

    /// Reading from the state store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FeedError {
    /// Helper: build a `CorruptState` error for a storage key.
    pub fn corrupt(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::CorruptState {
            key: key.into(),
            source,
        }
    }

    /// True when the error is the corruption class rather than a transport issue
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptState { .. })
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
