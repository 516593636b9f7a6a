#![forbid(unsafe_code)]

use serde::Serialize;
use thiserror::Error;

/// Registry misuse. These are configuration-time failures and abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate rule id: {rule_id}")]
    DuplicateRuleId { rule_id: String },

    #[error("unknown rule: {rule_id}")]
    UnknownRule { rule_id: String },

    #[error("input domain override is empty")]
    EmptyDomain,
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Failure raised while invoking one fixture variant.
///
/// Recorded on the verdict as `Errored`; never fatal to the run.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationError {
    #[error("missing input parameter: {name}")]
    MissingParam { name: String },

    #[error("input parameter {name} is not {expected}")]
    WrongType { name: String, expected: String },

    #[error("non-finite number in render output: {value}")]
    NonFiniteNumber { value: String },

    #[error("invalid render tree: {reason}")]
    InvalidTree { reason: String },

    #[error("variant panicked: {message}")]
    Panicked { message: String },

    #[error("{message}")]
    Failed { message: String },
}

impl InvocationError {
    #[must_use]
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParam { name: name.into() }
    }

    #[must_use]
    pub fn wrong_type(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::WrongType {
            name: name.into(),
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Convert a `catch_unwind` payload into an invocation error.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { message }
    }
}

pub type InvocationResult<T> = std::result::Result<T, InvocationError>;
