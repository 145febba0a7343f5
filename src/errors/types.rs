//! Error type definitions for varken
//!
//! Errors are grouped by the layer that raises them so callers can decide the
//! recovery granularity: a [`DecodeError`] drops one item, a [`SourceError`]
//! aborts one collection cycle, and a [`SinkError`] drops one write.

use thiserror::Error;

/// Maximum number of characters of a raw payload kept in a decode error
const RAW_INPUT_PREVIEW: usize = 256;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream API errors (transport, status, envelope)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A response item could not be turned into a typed record
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Metrics sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while talking to one of the polled services
#[derive(Error, Debug)]
pub enum SourceError {
    /// The request never produced a response
    #[error("Request to {service} failed: {message}")]
    Transport { service: String, message: String },

    /// The service answered with a non-success status
    #[error("HTTP error from {service}: {status} - {message}")]
    Http {
        service: String,
        status: u16,
        message: String,
    },

    /// The body was not the JSON document we expected
    #[error("Unexpected payload from {service}: {message}")]
    Payload { service: String, message: String },

    /// The service answered but reported a failure in its own envelope
    #[error("{service} reported failure: {message}")]
    Rejected { service: String, message: String },
}

/// Per-item decoding failures
///
/// Every variant keeps the schema name and a preview of the raw input so the
/// caller can log the offending item and move on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Input was neither an object nor a positional sequence
    #[error("{schema}: expected an object, got {input}")]
    NotAnObject { schema: &'static str, input: String },

    /// Positional input with the wrong number of elements
    #[error("{schema}: expected {expected} positional values, got {actual} in {input}")]
    Arity {
        schema: &'static str,
        expected: usize,
        actual: usize,
        input: String,
    },

    /// A declared field held a value of an incompatible shape
    #[error("{schema}: {reason} in {input}")]
    Shape {
        schema: &'static str,
        reason: String,
        input: String,
    },
}

/// Metrics sink failures
#[derive(Error, Debug)]
pub enum SinkError {
    /// The backend could not be reached or rejected the batch
    #[error("Write to {sink} failed: {message}")]
    Write { sink: String, message: String },

    /// The sink could not be brought up at start-up
    #[error("Failed to initialise {sink}: {message}")]
    Init { sink: String, message: String },

    /// A gauge could not be registered with the pull registry
    #[error("Failed to register metric {metric}: {message}")]
    Registration { metric: String, message: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl SourceError {
    pub fn transport<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Transport {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn payload<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Payload {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn rejected<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::Rejected {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl DecodeError {
    /// Name of the schema the item was decoded against
    pub fn schema(&self) -> &'static str {
        match self {
            Self::NotAnObject { schema, .. }
            | Self::Arity { schema, .. }
            | Self::Shape { schema, .. } => schema,
        }
    }

    /// Render a raw JSON value for inclusion in an error message
    pub fn preview(input: &serde_json::Value) -> String {
        let rendered = input.to_string();
        if rendered.chars().count() <= RAW_INPUT_PREVIEW {
            return rendered;
        }
        let mut truncated: String = rendered.chars().take(RAW_INPUT_PREVIEW).collect();
        truncated.push_str("...");
        truncated
    }
}

impl SinkError {
    pub fn write<S: Into<String>, M: Into<String>>(sink: S, message: M) -> Self {
        Self::Write {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn init<S: Into<String>, M: Into<String>>(sink: S, message: M) -> Self {
        Self::Init {
            sink: sink.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preview_keeps_short_payloads_intact() {
        let value = json!({"title": "Severance"});
        assert_eq!(DecodeError::preview(&value), r#"{"title":"Severance"}"#);
    }

    #[test]
    fn test_preview_truncates_long_payloads() {
        let value = json!({"overview": "x".repeat(1000)});
        let preview = DecodeError::preview(&value);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), RAW_INPUT_PREVIEW + 3);
    }

    #[test]
    fn test_decode_error_exposes_schema() {
        let err = DecodeError::Arity {
            schema: "SonarrEpisode",
            expected: 3,
            actual: 1,
            input: "[1]".to_string(),
        };
        assert_eq!(err.schema(), "SonarrEpisode");
        assert!(err.to_string().contains("expected 3 positional values"));
    }
}
