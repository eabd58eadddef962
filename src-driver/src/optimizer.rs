use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::callbacks::{Callbacks, Evaluation, Gradient};
use crate::error::DriverError;
use crate::problem::Problem;
use crate::registry::AlgorithmInfo;
use crate::value::Scalar;

/// Where gradients come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
    /// The solver differences the evaluate callback itself
    FiniteDifference,
    /// The driver's gradient callback supplies Jacobians from the host
    Provided,
}

/// Value of a solver option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    pub fn as_f64(&self, name: &str) -> Result<f64, DriverError> {
        match self {
            OptionValue::Float(v) => Ok(*v),
            OptionValue::Int(v) => Ok(*v as f64),
            other => Err(DriverError::option(name, format!("expected a number, got {}", other))),
        }
    }

    pub fn as_usize(&self, name: &str) -> Result<usize, DriverError> {
        match self {
            OptionValue::Int(v) if *v >= 0 => Ok(*v as usize),
            OptionValue::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Ok(*v as usize),
            other => Err(DriverError::option(
                name,
                format!("expected a non-negative integer, got {}", other),
            )),
        }
    }

    pub fn as_bool(&self, name: &str) -> Result<bool, DriverError> {
        match self {
            OptionValue::Bool(b) => Ok(*b),
            OptionValue::Int(v) => Ok(*v != 0),
            other => Err(DriverError::option(name, format!("expected a boolean, got {}", other))),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str, DriverError> {
        match self {
            OptionValue::Text(s) => Ok(s.as_str()),
            other => Err(DriverError::option(name, format!("expected text, got {}", other))),
        }
    }
}

/// Parses `true`/`false`, then integers, then floats; anything else is text
impl FromStr for OptionValue {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if let Ok(b) = t.parse::<bool>() {
            return Ok(OptionValue::Bool(b));
        }
        if let Ok(i) = t.parse::<i64>() {
            return Ok(OptionValue::Int(i));
        }
        if let Ok(f) = t.parse::<f64>() {
            return Ok(OptionValue::Float(f));
        }
        Ok(OptionValue::Text(t.to_string()))
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

/// A solver backend
pub trait Optimizer {
    fn info(&self) -> &'static AlgorithmInfo;

    /// Apply one named option; names the backend does not know are logged and ignored
    fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<(), DriverError>;

    /// Run the algorithm; `Solution::x` holds the solver's final vector
    fn optimize(
        &mut self,
        problem: &Problem,
        callbacks: &mut dyn Callbacks,
        sensitivity: Sensitivity,
    ) -> Result<Solution, DriverError>;
}

/// Outcome of one run, retained by the driver
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub algorithm: String,
    pub title: String,
    /// Final solver vector
    pub x: Vec<f64>,
    /// Host values recovered from `x`, one vector per parameter
    pub values: Vec<Vec<Scalar>>,
    pub variable_names: Vec<String>,
    pub parameter_names: Vec<String>,
    pub objective_names: Vec<String>,
    pub constraint_names: Vec<String>,
    /// Objectives at the final model run
    pub objectives: Vec<f64>,
    /// Signed constraint values at the final model run
    pub constraints: Vec<f64>,
    /// Best scalarized value reported by the solver
    pub fun: f64,
    pub success: bool,
    pub message: String,
    pub evaluations: usize,
    pub gradients: usize,
    pub failures: usize,
}

impl Solution {
    pub fn new(algorithm: &str, x: Vec<f64>, fun: f64, success: bool, message: String) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            x,
            fun,
            success,
            message,
            ..Default::default()
        }
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Problem -- {}", self.title)?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "  Solver: {} ({})", self.algorithm, self.message)?;
        writeln!(
            f,
            "  Evaluations: {}  Gradients: {}  Failures: {}",
            self.evaluations, self.gradients, self.failures
        )?;
        writeln!(f, "\n  Objectives:")?;
        for (name, v) in self.objective_names.iter().zip(self.objectives.iter()) {
            writeln!(f, "    {:<24} {:>14.6e}", name, v)?;
        }
        writeln!(f, "\n  Variables:")?;
        for (name, v) in self.variable_names.iter().zip(self.x.iter()) {
            writeln!(f, "    {:<24} {:>14.6e}", name, v)?;
        }
        for (name, values) in self.parameter_names.iter().zip(self.values.iter()) {
            let shown: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            writeln!(f, "    {:<24} = {}", name, shown.join(", "))?;
        }
        if !self.constraints.is_empty() {
            writeln!(f, "\n  Constraints (>= 0 or = 0 when satisfied):")?;
            for (name, v) in self.constraint_names.iter().zip(self.constraints.iter()) {
                writeln!(f, "    {:<24} {:>14.6e}", name, v)?;
            }
        }
        Ok(())
    }
}

/// Single-objective view of an evaluation: the sum of all objectives
pub fn scalarize(objectives: &[f64]) -> f64 {
    objectives.iter().sum()
}

/// Warn once per run when objectives are summed
pub fn warn_if_scalarized(problem: &Problem, algorithm: &str) {
    if problem.n_objectives() > 1 {
        log::warn!(
            "{} is single-objective: minimizing the sum of {} objectives ({})",
            algorithm,
            problem.n_objectives(),
            problem.objectives.join(" + ")
        );
    }
}

/// Quadratic penalty for violated constraints; equality rows come first
pub fn penalty(constraints: &[f64], n_eq: usize) -> f64 {
    let mut p = 0.0;
    for (i, &c) in constraints.iter().enumerate() {
        let v = if i < n_eq { c } else { c.min(0.0) };
        p += v * v;
    }
    p
}

/// Total violation: `|h| - tol` for equality rows, `-g` for inequality rows
pub fn violation(constraints: &[f64], n_eq: usize, eq_tol: f64) -> f64 {
    let mut v = 0.0;
    for (i, &c) in constraints.iter().enumerate() {
        v += if i < n_eq {
            (c.abs() - eq_tol).max(0.0)
        } else {
            (-c).max(0.0)
        };
    }
    v
}

/// Forward-difference Jacobian built from the evaluate callback.
///
/// `base` is the evaluation at `x`. The step is relative to `|x_j|` with a
/// floor of `step`, and goes backwards when a forward step leaves the bounds.
pub fn finite_difference(
    callbacks: &mut dyn Callbacks,
    problem: &Problem,
    x: &[f64],
    base: &Evaluation,
    step: f64,
) -> Gradient {
    let n = problem.n_variables();
    let n_obj = base.objectives.len();
    let n_con = base.constraints.len();
    if base.fail {
        return Gradient::failed(n);
    }
    let mut objectives = Array2::<f64>::zeros((n_obj, n));
    let mut constraints = Array2::<f64>::zeros((n_con, n));
    let mut xp = x[..n].to_vec();
    for j in 0..n {
        let var = &problem.variables[j];
        let mut h = step * x[j].abs().max(1.0);
        if x[j] + h > var.upper {
            h = -h;
        }
        xp[j] = x[j] + h;
        let ev = callbacks.evaluate(&xp);
        xp[j] = x[j];
        if ev.fail || ev.objectives.len() != n_obj || ev.constraints.len() != n_con {
            return Gradient::failed(n);
        }
        for i in 0..n_obj {
            objectives[[i, j]] = (ev.objectives[i] - base.objectives[i]) / h;
        }
        for i in 0..n_con {
            constraints[[i, j]] = (ev.constraints[i] - base.constraints[i]) / h;
        }
    }
    Gradient {
        objectives,
        constraints,
        fail: false,
    }
}
