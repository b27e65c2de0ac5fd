//! Error taxonomy for remote variable operations.

use thiserror::Error;

/// Longest body excerpt carried by [`ApiError::Remote`].
pub const BODY_EXCERPT_LIMIT: usize = 200;

/// Failure of a fetch or write against the variable resource.
///
/// `Clone` so outcomes can travel through the message loop unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Required settings are absent; no request was attempted.
    #[error("Missing configuration: {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    /// Network-level failure: DNS, connect, timeout, abort.
    #[error("{message}")]
    Transport { message: String },

    /// The server answered outside the success range.
    #[error("{status} {status_text}{}", body_suffix(.body))]
    Remote {
        status: u16,
        status_text: String,
        body: Option<String>,
    },

    /// A success response whose body was not a JSON object.
    #[error("invalid response body: {message}")]
    Decode { message: String },

    /// The configured base URL override was rejected.
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ApiError {
    pub fn configuration(missing: Vec<&'static str>) -> Self {
        Self::Configuration { missing }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Build a remote error, trimming the body to [`BODY_EXCERPT_LIMIT`]
    /// characters and dropping it when blank.
    pub fn remote(status: u16, status_text: impl Into<String>, body: Option<&str>) -> Self {
        Self::Remote {
            status,
            status_text: status_text.into(),
            body: body.map(str::trim).filter(|text| !text.is_empty()).map(excerpt),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// HTTP status for remote failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn body_suffix(body: &Option<String>) -> String {
    match body {
        Some(text) => format!(": {text}"),
        None => String::new(),
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= BODY_EXCERPT_LIMIT {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(BODY_EXCERPT_LIMIT.saturating_sub(3)).collect();
    truncated.truncate(truncated.trim_end().len());
    format!("{truncated}...")
}
