use std::path::PathBuf;

/// Errors raised by a model host
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("unknown name: {0}")]
    UnknownName(String),

    #[error("value of {0} is not numeric")]
    NotNumeric(String),

    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    Shape {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("model has not been run yet")]
    NotEvaluated,

    #[error("model evaluation failed: {0}")]
    Model(String),
}

/// Errors raised by the driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("parameter {name} has an unsupported type: {reason}")]
    InvalidParameterType { name: String, reason: String },

    #[error("optimizer {name} is not available; installed: {}", available.join(", "))]
    UnsupportedOptimizer {
        name: String,
        available: Vec<String>,
    },

    #[error("evaluation failed at x={x:?}: {reason}")]
    EvaluationFailure { x: Vec<f64>, reason: String },

    #[error("gradient failed at x={x:?}: {reason}")]
    GradientFailure { x: Vec<f64>, reason: String },

    #[error("invalid value for option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("host error")]
    Host(#[from] HostError),

    #[error("history file {path}: {reason}")]
    History { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("solver error: {0}")]
    Solver(String),
}

impl DriverError {
    /// Short category name reported to the host
    pub fn category(&self) -> &'static str {
        match self {
            DriverError::InvalidParameterType { .. } => "InvalidParameterType",
            DriverError::UnsupportedOptimizer { .. } => "UnsupportedOptimizer",
            DriverError::EvaluationFailure { .. } => "EvaluationFailure",
            DriverError::GradientFailure { .. } => "GradientFailure",
            DriverError::InvalidOption { .. } => "InvalidOption",
            DriverError::Host(_) => "Host",
            DriverError::History { .. } => "History",
            DriverError::Config(_) => "Config",
            DriverError::Solver(_) => "Solver",
        }
    }

    pub(crate) fn option(name: &str, reason: impl Into<String>) -> Self {
        DriverError::InvalidOption {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Render an error with its whole `source()` chain
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": caused by: ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}
