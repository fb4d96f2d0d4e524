use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Pass that raised a numerical failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    Smoother,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Stage::Filter => write!(f, "forward filter"),
            Stage::Smoother => write!(f, "backward smoother"),
        }
    }
}

/// Trajectory smoother error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SmootherError {
    #[error("No observations to smooth")]
    EmptyInput,

    #[error("Length mismatch: {expected} records but {actual} smoothed positions")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Numerical instability in {stage} at step {step}")]
    NumericalInstability { stage: Stage, step: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for smoother operations
pub type SmootherResult<T> = Result<T, SmootherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SmootherError::NumericalInstability {
            stage: Stage::Smoother,
            step: 7,
        };
        assert_eq!(
            err.to_string(),
            "Numerical instability in backward smoother at step 7"
        );

        let err = SmootherError::LengthMismatch {
            expected: 3,
            actual: 2,
        };
        assert!(err.to_string().contains("3 records"));
    }
}
