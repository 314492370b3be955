use reqwest::StatusCode;
use thiserror::Error;

/// Number of characters of a rejected response body kept in error messages.
const DETAIL_EXCERPT_LEN: usize = 500;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Missing {0}: a non-empty provider credential is required")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered with a status that is neither retryable nor a
    /// request-shape rejection.
    #[error("{message}")]
    Rejected {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The provider could not process the request body as sent.
    #[error("{provider} API error {status}: {detail}")]
    ShapeRejected {
        provider: &'static str,
        status: u16,
        detail: String,
    },

    #[error("Unable to reach {provider} API: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unable to reach {provider} API: request timed out after {seconds:.1}s")]
    Timeout { provider: &'static str, seconds: f64 },

    /// Every candidate and retry was consumed. `status` is the last observed
    /// HTTP status, or `None` when the provider was never reached.
    #[error("{message}")]
    Exhausted {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to decode {provider} response: {detail}")]
    Decode {
        provider: &'static str,
        detail: String,
    },

    #[error("Lost connection to {provider} API while streaming: {detail}")]
    Stream {
        provider: &'static str,
        detail: String,
    },
}

impl ProviderError {
    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport { .. } | ProviderError::Timeout { .. } => true,
            ProviderError::Rejected { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// The HTTP status that caused this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Rejected { status, .. } | ProviderError::ShapeRejected { status, .. } => {
                Some(*status)
            }
            ProviderError::Exhausted { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn rejected(provider: &'static str, status: StatusCode) -> Self {
        ProviderError::Rejected {
            provider,
            status: status.as_u16(),
            message: friendly_status_message(provider, status),
        }
    }

    pub(crate) fn shape_rejected(provider: &'static str, status: StatusCode, body: &str) -> Self {
        ProviderError::ShapeRejected {
            provider,
            status: status.as_u16(),
            detail: excerpt(body),
        }
    }

    /// Convert the last per-attempt failure into the terminal error handed to
    /// the caller once no attempts remain.
    pub(crate) fn exhausted(self) -> Self {
        match self {
            ProviderError::Rejected {
                provider,
                status,
                message,
            } => ProviderError::Exhausted {
                provider,
                status: Some(status),
                message,
            },
            ProviderError::ShapeRejected {
                provider,
                status,
                detail,
            } => ProviderError::Exhausted {
                provider,
                status: Some(status),
                message: format!("{} API error {}: {}", provider, status, detail),
            },
            other => {
                let provider = match &other {
                    ProviderError::Transport { provider, .. }
                    | ProviderError::Timeout { provider, .. } => *provider,
                    _ => return other,
                };
                ProviderError::Exhausted {
                    provider,
                    status: None,
                    message: other.to_string(),
                }
            }
        }
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn friendly_status_message(provider: &str, status: StatusCode) -> String {
    match status.as_u16() {
        429 => format!(
            "{} API rate limit exceeded. Please try again shortly.",
            provider
        ),
        401 | 403 => format!(
            "Invalid {} API key or insufficient permissions.",
            provider
        ),
        500..=599 => format!(
            "{} API is currently unavailable. Please retry later.",
            provider
        ),
        code => format!("Unexpected {} API error (status {}).", provider, code),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(DETAIL_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
