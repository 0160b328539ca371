use thiserror::Error;

/// Provider call failures, classified for the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Provider rejected the credentials: {0}")]
    Auth(String),

    #[error("Could not reach the provider: {0}")]
    Network(String),

    #[error("Provider call timed out: {0}")]
    Timeout(String),

    #[error("Provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),
}

impl LlmError {
    /// Classify a non-success HTTP status from the provider.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {}: {}", status, truncate(body, 500));
        match status {
            401 | 403 => LlmError::Auth(detail),
            400 | 404 | 413 | 422 => LlmError::InvalidInput(detail),
            408 | 504 => LlmError::Timeout(detail),
            _ => LlmError::ProviderRejected(detail),
        }
    }

    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            LlmError::Auth(_) => "auth",
            LlmError::Network(_) => "network",
            LlmError::Timeout(_) => "timeout",
            LlmError::ProviderRejected(_) => "provider-rejected",
            LlmError::InvalidInput(_) => "invalid-input",
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else if e.is_decode() {
            LlmError::ProviderRejected(format!("unreadable response: {}", e))
        } else if e.is_builder() {
            LlmError::InvalidInput(e.to_string())
        } else {
            LlmError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(e: serde_json::Error) -> Self {
        LlmError::ProviderRejected(format!("unexpected response shape: {}", e))
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(LlmError::from_status(401, "").reason(), "auth");
        assert_eq!(LlmError::from_status(403, "").reason(), "auth");
        assert_eq!(LlmError::from_status(400, "bad").reason(), "invalid-input");
        assert_eq!(LlmError::from_status(504, "").reason(), "timeout");
        assert_eq!(LlmError::from_status(429, "slow down").reason(), "provider-rejected");
        assert_eq!(LlmError::from_status(500, "").reason(), "provider-rejected");
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "가".repeat(2000);
        let LlmError::ProviderRejected(detail) = LlmError::from_status(500, &body) else {
            panic!("expected provider-rejected");
        };
        assert!(detail.chars().count() < 600);
    }
}
