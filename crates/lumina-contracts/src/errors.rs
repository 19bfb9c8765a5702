use thiserror::Error;

pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "API key is missing. Set GEMINI_API_KEY (or GOOGLE_API_KEY) before editing.";
pub const EMPTY_RESULT_MESSAGE: &str =
    "The model did not return an edited image. Try a different prompt.";
pub const UPSTREAM_FALLBACK_MESSAGE: &str = "Failed to process image transformation.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GatewayErrorKind {
    Configuration,
    EmptyResult,
    Upstream,
    InvalidInput,
}

impl GatewayErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::EmptyResult => "empty_result",
            Self::Upstream => "upstream",
            Self::InvalidInput => "invalid_input",
        }
    }
}

/// Failure reported by a gateway call.
///
/// `Display` is the human-readable text shown to the user, so every variant
/// renders only its message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    EmptyResult(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    InvalidInput(String),
}

impl GatewayError {
    pub fn missing_credential() -> Self {
        Self::Configuration(MISSING_CREDENTIAL_MESSAGE.to_string())
    }

    pub fn empty_result(model_note: Option<&str>) -> Self {
        match model_note.map(str::trim).filter(|note| !note.is_empty()) {
            Some(note) => Self::EmptyResult(format!("{EMPTY_RESULT_MESSAGE} (model said: {note})")),
            None => Self::EmptyResult(EMPTY_RESULT_MESSAGE.to_string()),
        }
    }

    /// Keeps the service's own message when there is one.
    pub fn upstream(message: impl Into<String>) -> Self {
        let message = message.into();
        let trimmed = message.trim();
        if trimmed.is_empty() {
            Self::Upstream(UPSTREAM_FALLBACK_MESSAGE.to_string())
        } else {
            Self::Upstream(trimmed.to_string())
        }
    }

    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::Configuration(_) => GatewayErrorKind::Configuration,
            Self::EmptyResult(_) => GatewayErrorKind::EmptyResult,
            Self::Upstream(_) => GatewayErrorKind::Upstream,
            Self::InvalidInput(_) => GatewayErrorKind::InvalidInput,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(message)
            | Self::EmptyResult(message)
            | Self::Upstream(message)
            | Self::InvalidInput(message) => message,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}
