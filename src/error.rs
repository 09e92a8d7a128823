use crate::pipeline::PipelineError;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "audioUrl", "messages")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected shape, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "dispatcher", "tts")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the relay.
///
/// Every variant maps onto an HTTP status through [`Error::status_code`], which is
/// what the server adapter reports back to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A credential or setting the request needs is missing.
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The request body is missing a field or has the wrong shape.
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// The application's authorization predicate rejected the request.
    #[error("Unauthorized")]
    Unauthorized,

    /// The action tag has no handler, or is outside the configured allow-list.
    #[error("Unsupported action: {action}")]
    UnsupportedAction { action: String },

    /// Non-success status from a third-party API. The message is the upstream
    /// response text, unmodified.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Stream processing error: {0}")]
    Stream(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn unsupported_action(action: impl Into<String>) -> Self {
        Error::UnsupportedAction {
            action: action.into(),
        }
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Error::Upstream {
            status,
            message: message.into(),
        }
    }

    /// HTTP status reported to the caller.
    ///
    /// Upstream failures are not normalized: they all surface as a generic 500
    /// carrying the upstream text.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Configuration { .. }
            | Error::Validation { .. }
            | Error::UnsupportedAction { .. } => 400,
            Error::Unauthorized => 405,
            Error::Upstream { .. }
            | Error::Transport(_)
            | Error::Stream(_)
            | Error::Io(_)
            | Error::Serialization(_) => 500,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// Status returned by the upstream API, when the failure came from one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(Error::configuration("missing key").status_code(), 400);
        assert_eq!(Error::validation("missing field").status_code(), 400);
        assert_eq!(Error::unsupported_action("paint").status_code(), 400);
        assert_eq!(Error::Unauthorized.status_code(), 405);
        assert_eq!(Error::upstream(401, "nope").status_code(), 500);
    }

    #[test]
    fn upstream_message_is_raw_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        let err = Error::upstream(401, body);
        assert_eq!(err.to_string(), body);
        assert_eq!(err.upstream_status(), Some(401));
    }

    #[test]
    fn context_is_rendered() {
        let err = Error::validation_with_context(
            "audio reference required",
            ErrorContext::new()
                .with_field_path("audioUrl")
                .with_source("stt"),
        );
        assert_eq!(
            err.to_string(),
            "Validation error: audio reference required (field: audioUrl, source: stt)"
        );
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("audioUrl")
        );
    }
}
