use ndarray::Array2;

use crate::error::{DriverError, HostError};
use crate::parameter::ParameterSpec;
use crate::problem::Comparison;
use crate::value::Scalar;

/// A declared constraint: `lhs <cmp> rhs`, reported by the host as the
/// residual `lhs - rhs`, one value per element.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    pub name: String,
    pub size: usize,
    pub comparison: Comparison,
}

impl ConstraintSpec {
    pub fn new(name: &str, comparison: Comparison) -> Self {
        Self {
            name: name.to_string(),
            size: 1,
            comparison,
        }
    }

    pub fn vector(name: &str, size: usize, comparison: Comparison) -> Self {
        Self {
            name: name.to_string(),
            size,
            comparison,
        }
    }
}

/// The model-evaluation framework the driver optimizes.
///
/// Objective and constraint values are read after [`Host::run_iteration`].
/// Constraint residuals are returned equality constraints first, then
/// inequality constraints, each flattened in declaration order.
pub trait Host: Send {
    fn parameters(&self) -> Vec<ParameterSpec>;
    fn objectives(&self) -> Vec<String>;
    fn eq_constraints(&self) -> Vec<ConstraintSpec>;
    fn ineq_constraints(&self) -> Vec<ConstraintSpec>;

    /// Set every parameter, positionally, one value vector per parameter
    fn set_parameters(&mut self, values: &[Vec<Scalar>]) -> Result<(), HostError>;

    /// Run the model once with the current parameter values
    fn run_iteration(&mut self) -> Result<(), HostError>;

    fn eval_objectives(&self) -> Result<Vec<f64>, HostError>;
    fn eval_constraints(&self) -> Result<Vec<f64>, HostError>;

    /// Jacobian of the flattened outputs named in `of` with respect to the
    /// flattened parameters named in `wrt`, rows in `of` order
    fn calc_gradient(&mut self, wrt: &[String], of: &[String]) -> Result<Array2<f64>, HostError>;

    /// Record a fatal driver error; `error.category()` gives its kind
    fn report_error(&mut self, _error: &DriverError) {}
}
