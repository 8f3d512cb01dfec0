// Error types for risk scoring.
use std::fmt;
use thiserror::Error;

/// Failures surfaced by encoding, training, inference and artifact handling.
#[derive(Debug, Error)]
pub enum RiskError {
    /// A required column is missing from an input or reference file.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The reference dataset or an input file has malformed values.
    #[error("Data error: {0}")]
    Data(String),

    /// A persisted artifact is missing, corrupt or inconsistent.
    #[error("Artifact load error: {0}")]
    ArtifactLoad(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RiskError>;

/// Training finished but the solver stopped short of the gradient tolerance.
///
/// Not fatal: the fitted model is still returned, with this attached to the
/// training report so the caller can decide what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceWarning {
    pub gradient_norm: f64,
    pub tolerance: f64,
    pub max_iterations: u64,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "solver did not converge within {} iterations (gradient norm {:.3e} > tolerance {:.1e})",
            self.max_iterations, self.gradient_norm, self.tolerance
        )
    }
}
