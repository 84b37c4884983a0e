use thiserror::Error;

/// Error type for token operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature does not match")]
    BadSignature,

    #[error("Token is expired")]
    Expired,
}

impl TokenError {
    /// Short label for the failure, suitable for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::EncodingFailed(_) => "encoding_failed",
            TokenError::Malformed(_) => "malformed",
            TokenError::BadSignature => "bad_signature",
            TokenError::Expired => "expired",
        }
    }
}

/// Error for signing key construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Signing secret is not configured")]
    Missing,

    #[error("Development fallback signing key refused in production")]
    FallbackInProduction,
}
