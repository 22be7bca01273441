use stockpal_core::{ChartError, ConfigError, CoreError, ResolveError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Unresolved(#[from] ResolveError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(error) => Self::Validation(error),
            CoreError::Resolve(error) => Self::Unresolved(error),
            CoreError::Config(error) => Self::Config(error),
            CoreError::Chart(error) => Self::Chart(error),
            CoreError::Serialization(error) => Self::Serialization(error),
            CoreError::Io(error) => Self::Io(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Chart(_) => 2,
            Self::Unresolved(_) | Self::StrictModeViolation { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_categories() {
        let unresolved = CliError::from(ResolveError::NoMatch {
            query: String::from("zzzzz"),
        });
        assert_eq!(unresolved.exit_code(), 3);
        assert_eq!(CliError::from(ValidationError::InvalidTarget).exit_code(), 2);
        assert_eq!(
            CliError::from(CoreError::Io(std::io::Error::other("disk full"))).exit_code(),
            10
        );
    }
}
