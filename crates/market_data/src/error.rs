use common::models::SessionState;
use thiserror::Error;

/// Connection-level failure. Always handled by the reconnect policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connect timed out after {0} ms")]
    Timeout(u64),
    #[error("send failed: {0}")]
    Send(String),
    #[error("connection closed")]
    Closed,
}

/// A single inbound frame that could not be turned into a message.
#[derive(Error, Debug)]
pub enum MalformedMessage {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' is not a finite number: {value}")]
    NotFinite { field: &'static str, value: String },
    #[error("field '{field}' has an invalid value: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Historical seed failed; startup is aborted and retried from the top.
#[derive(Error, Debug)]
pub enum SeedLoadError {
    #[error("history request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("history request returned HTTP {0}")]
    Status(u16),
    #[error("history payload is not an array")]
    NotAnArray,
    #[error("history payload is empty")]
    Empty,
    #[error("history row {index} is malformed: {reason}")]
    MalformedRow { index: usize, reason: String },
}

/// Why an outbound intent was not written.
#[derive(Error, Debug, PartialEq)]
pub enum SendError {
    #[error("not connected (session is {0})")]
    NotConnected(SessionState),
    #[error("feed is read-only")]
    ReadOnlyFeed,
    #[error("invalid trade amount {0}")]
    InvalidAmount(f64),
    #[error("no reference price yet")]
    NoReferencePrice,
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Malformed(#[from] MalformedMessage),
    #[error(transparent)]
    SeedLoad(#[from] SeedLoadError),
    #[error("gave up after {attempts} reconnect attempts")]
    ExhaustedRetries { attempts: u32 },
}
