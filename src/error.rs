//! Error types for nlip-agent.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A wire payload that does not parse into the envelope shape.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A non-2xx HTTP reply from a peer worker.
    #[error("Transport error: HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("{0}")]
    Other(String),
}
