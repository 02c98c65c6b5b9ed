//! Capability error types.
//!
//! These errors represent failures when talking to the external recognition
//! and completion services. Defined here in `inkmath-core` so the validator
//! can downcast and classify errors for retry decisions without string
//! matching.

use thiserror::Error;

/// Errors that can occur when calling an external capability.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid or missing credentials).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The API answered successfully but carried no usable content.
    #[error("empty response from provider")]
    EmptyResponse,
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_classification() {
        assert!(ProviderError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(ProviderError::ModelNotFound("nope".into()).is_permanent());
        assert!(!ProviderError::NetworkError("reset".into()).is_permanent());
        assert!(!ProviderError::EmptyResponse.is_permanent());
    }

    #[test]
    fn retry_after_extraction() {
        let e = ProviderError::RateLimited {
            retry_after_ms: 2500,
        };
        assert_eq!(e.retry_after_ms(), Some(2500));
        assert_eq!(ProviderError::Timeout(30).retry_after_ms(), None);
    }
}
