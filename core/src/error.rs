//! Error types for the Hub Numérique client.
//!
//! # Design
//! Configuration and validation problems are detected locally, before any
//! request leaves the process. Everything that goes wrong inside a
//! `Connector` is carried in `Transport` untouched so the caller sees the
//! connector's own error through `source()`.

use thiserror::Error;

/// Errors returned by `Client` construction, setters and operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown environment, or an attempt to weaken TLS in production.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An availability line is missing one or more required fields.
    /// `line` holds the offending item serialized as JSON.
    #[error("availability line {index} is missing required fields: {line}")]
    Validation { index: usize, line: String },

    /// Failure raised by the connector while performing the request.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap any connector-side failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport(Box::new(err))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Error::transport(err)
    }
}
