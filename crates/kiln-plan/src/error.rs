/// Build plan error types
use crate::targets::TargetKind;
use thiserror::Error;

pub type PlanResult<T> = Result<T, PlanError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error(
        "Cannot create interface proxy: target '{target}' must be a static or shared library, but it is a {kind}"
    )]
    UnsupportedProxySource { target: String, kind: TargetKind },

    #[error("Target '{target}' is already defined")]
    DuplicateTarget { target: String },

    #[error("Target not found: {target}")]
    TargetNotFound { target: String },

    #[error("Invalid executable arguments: {0}")]
    InvalidArguments(String),

    #[error("Both CUDA and ROCm backends are enabled; at most one accelerator backend may be active")]
    ConflictingBackends,

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Invalid target configuration: {0}")]
    InvalidTarget(String),

    #[error("Failed to serialize plan: {0}")]
    Serialization(String),

    #[error("Unknown {field} '{value}'")]
    UnknownSetting { field: &'static str, value: String },
}

impl PlanError {
    /// Create an unsupported proxy source error
    pub fn unsupported_proxy_source(target: impl Into<String>, kind: TargetKind) -> Self {
        Self::UnsupportedProxySource {
            target: target.into(),
            kind,
        }
    }

    /// Create a duplicate target error
    pub fn duplicate_target(target: impl Into<String>) -> Self {
        Self::DuplicateTarget {
            target: target.into(),
        }
    }

    /// Create an unknown setting error
    pub fn unknown_setting(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownSetting {
            field,
            value: value.into(),
        }
    }

    /// Create a target not found error
    pub fn target_not_found(target: impl Into<String>) -> Self {
        Self::TargetNotFound {
            target: target.into(),
        }
    }
}
