//! Webhook intake error types.

use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors raised while handling a payment event.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The event payload is unusable (e.g. non-positive amount on success).
    #[error("Invalid payment event: {0}")]
    InvalidEvent(String),

    /// Posting the payment application failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Durable dedup store failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl WebhookError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::Ledger(err) => err.error_code(),
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether the provider should redeliver the event.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidEvent(_) => false,
            Self::Ledger(err) => err.is_retryable(),
            Self::Store(_) => true,
        }
    }
}

impl From<WebhookError> for keel_shared::AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidEvent(message) => Self::Validation(message),
            WebhookError::Ledger(inner) => inner.into(),
            WebhookError::Store(message) => Self::Store(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            WebhookError::InvalidEvent("bad".to_string()).error_code(),
            "INVALID_EVENT"
        );
        assert_eq!(
            WebhookError::Ledger(LedgerError::InsufficientLines).error_code(),
            "INSUFFICIENT_LINES"
        );
    }

    #[test]
    fn test_retryability() {
        assert!(WebhookError::Store("down".to_string()).is_retryable());
        assert!(!WebhookError::InvalidEvent("bad".to_string()).is_retryable());
        assert!(!WebhookError::Ledger(LedgerError::InsufficientLines).is_retryable());
    }
}
