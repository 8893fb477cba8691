// Error taxonomy for an ingestion run

use thiserror::Error;

/// Longest fragment of model output kept in a malformed-JSON error
const MAX_FRAGMENT_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The language-model API was unreachable, timed out or answered with an error
    #[error("Language model request failed: {0}")]
    Transport(String),

    /// A fenced or bracketed JSON block was present but did not parse
    #[error("Malformed JSON in model response: {message}")]
    MalformedJson { message: String, fragment: String },

    /// A JSON-shaped endpoint received text with no JSON in it
    #[error("Model response contained no JSON block")]
    MissingJson,

    /// The transactional write failed and was rolled back
    #[error("Persistence failed: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn malformed_json(message: impl Into<String>, fragment: &str) -> Self {
        Self::MalformedJson {
            message: message.into(),
            fragment: truncate_fragment(fragment),
        }
    }

    /// Stable category name, so callers can tell parse, transport and
    /// persistence failures apart without matching on variants
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::MalformedJson { .. } | Self::MissingJson => "parse",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
        }
    }

    /// Parsing is pure, so a failed commit can be re-run from the same text
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Persistence(_))
    }
}

/// Cut a fragment down to a loggable size on a char boundary
pub fn truncate_fragment(fragment: &str) -> String {
    if fragment.len() <= MAX_FRAGMENT_LEN {
        return fragment.to_string();
    }
    let mut end = MAX_FRAGMENT_LEN;
    while !fragment.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &fragment[..end])
}
