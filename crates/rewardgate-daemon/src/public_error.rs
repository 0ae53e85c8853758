//! Mapping from the claim error taxonomy to what callers are allowed to see.

use axum::http::StatusCode;
use rewardgate_core::error::{ClaimError, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicErrorCode {
    InvalidInput,
    Forbidden,
    RateLimited,
    Internal,
}

impl PublicErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::Forbidden => "FORBIDDEN",
            Self::RateLimited => "RATE_LIMITED",
            Self::Internal => "INTERNAL",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn public_code(err: &ClaimError) -> PublicErrorCode {
    match err {
        ClaimError::Validation(_) => PublicErrorCode::InvalidInput,
        ClaimError::Authorization { .. } => PublicErrorCode::Forbidden,
        ClaimError::Contention { .. } => PublicErrorCode::RateLimited,
        ClaimError::Configuration(_) | ClaimError::Upstream(_) => PublicErrorCode::Internal,
    }
}

/// Caller-facing message. Only the eligibility gate reports its detail
/// (the unmet requirement); everything else is a fixed string.
pub fn public_message(err: &ClaimError) -> String {
    match err {
        ClaimError::Validation(_) => "bad request".to_string(),
        ClaimError::Authorization {
            kind: Rejection::Ineligible,
            detail,
        } => format!("{}: {detail}", Rejection::Ineligible),
        ClaimError::Authorization { kind, .. } => kind.as_str().to_string(),
        ClaimError::Contention { kind, .. } => kind.as_str().to_string(),
        ClaimError::Configuration(_) | ClaimError::Upstream(_) => "internal error".to_string(),
    }
}
