//! Error types for feedrelay.
//!
//! Library crates use [`FeedRelayError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all feedrelay operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedRelayError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP error (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// XML/HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// No fetch strategy is registered for the provider type.
    #[error("unsupported provider type {provider_type:?}")]
    UnsupportedProviderType { provider_type: String },

    /// The provider entry cannot be fetched as configured.
    #[error("invalid provider config for {provider:?}: {message}")]
    InvalidProviderConfig { provider: String, message: String },

    /// The source produced nothing usable.
    #[error("fetch failed for provider {provider:?}: {message}")]
    SourceFetchFailed { provider: String, message: String },

    /// No sink builder is registered for the sink type.
    #[error("unsupported sink type {sink_type:?} for sink {sink:?}")]
    UnsupportedSinkType { sink: String, sink_type: String },

    /// A sink could not be constructed from its config.
    #[error("sink {sink:?} could not be built: {message}")]
    SinkBuild { sink: String, message: String },

    /// A sink failed to deliver an event.
    #[error("delivery to sink {sink:?} failed: {message}")]
    Delivery { sink: String, message: String },

    /// Seen-item store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The operation observed a cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FeedRelayError>;

impl FeedRelayError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a fetch failure for a provider.
    pub fn fetch_failed(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SourceFetchFailed {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    /// Create a sink construction failure.
    pub fn sink_build(sink: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SinkBuild {
            sink: sink.into(),
            message: msg.into(),
        }
    }

    /// Create a delivery failure for a sink.
    pub fn delivery(sink: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Delivery {
            sink: sink.into(),
            message: msg.into(),
        }
    }

    /// Whether this error came from an observed cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
