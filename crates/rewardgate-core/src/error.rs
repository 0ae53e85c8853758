use std::fmt;

use thiserror::Error;

pub type ClaimResult<T> = Result<T, ClaimError>;

/// Policy rejections. Each maps to a fixed public message so callers never
/// learn list contents or internal thresholds beyond what the gate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Blocked,
    NotYetAvailable,
    OwnershipUnverified,
    Ineligible,
    Forbidden,
    PreconditionNotMet,
}

impl Rejection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::NotYetAvailable => "not yet available",
            Self::OwnershipUnverified => "ownership unverified",
            Self::Ineligible => "ineligible",
            Self::Forbidden => "forbidden",
            Self::PreconditionNotMet => "precondition not met",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contention {
    LockHeld,
    AlreadyClaimed,
}

impl Contention {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LockHeld => "too many requests",
            Self::AlreadyClaimed => "already claimed this period",
        }
    }
}

impl fmt::Display for Contention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{kind}: {detail}")]
    Authorization { kind: Rejection, detail: String },

    #[error("{kind}; retry after {retry_after_ms}ms")]
    Contention { kind: Contention, retry_after_ms: u64 },

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ClaimError {
    pub fn rejected(kind: Rejection, detail: impl Into<String>) -> Self {
        Self::Authorization {
            kind,
            detail: detail.into(),
        }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::Upstream(detail.into())
    }

    /// Short label used for log fields and failure counters.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Validation(_) => "validation",
            Self::Authorization { .. } => "authorization",
            Self::Contention { .. } => "contention",
            Self::Upstream(_) => "upstream",
        }
    }
}
