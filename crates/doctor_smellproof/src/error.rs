use smellproof_harness::RegistryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DoctorError>;

/// Exit code for usage and configuration mistakes.
pub const CONFIG_EXIT_CODE: i32 = 2;

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

impl DoctorError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            Self::Registry(_) | Self::InvalidArgument { .. } => CONFIG_EXIT_CODE,
            Self::Io(_) | Self::Json(_) => 1,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_constructor_preserves_code_and_message() {
        let error = DoctorError::exit(42, "boom");
        assert_eq!(error.exit_code(), 42);
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn configuration_errors_exit_with_two() {
        let unknown = DoctorError::from(RegistryError::UnknownRule {
            rule_id: "nope".into(),
        });
        assert_eq!(unknown.exit_code(), 2);
        assert_eq!(unknown.to_string(), "registry error: unknown rule: nope");
        assert_eq!(DoctorError::invalid("bad --input").exit_code(), 2);
    }

    #[test]
    fn io_errors_exit_with_one() {
        let error = DoctorError::from(std::io::Error::other("disk full"));
        assert_eq!(error.exit_code(), 1);
    }
}
