//! Solver-facing problem description.
//!
//! Parameters are flattened one variable per element, in host order. The same
//! layout is used to unpack every solver vector, so the ordering here is the
//! contract between the host and the solver.
//!
//! Constraint rows are equality rows first, then inequality rows. Inequality
//! rows are signed so that a non-negative value means the constraint holds:
//! the host residual is `lhs - rhs`, kept for `>=` and negated for `<=`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DriverError;
use crate::host::ConstraintSpec;
use crate::parameter::{ParameterSpec, VariableKind, classify};
use crate::value::Scalar;

/// Constraint direction as declared by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Equal,
    LessEq,
    GreaterEq,
}

impl Comparison {
    /// Multiplier applied to the host residual
    pub fn sign(self) -> f64 {
        match self {
            Comparison::Equal | Comparison::GreaterEq => 1.0,
            Comparison::LessEq => -1.0,
        }
    }
}

impl FromStr for Comparison {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(Comparison::Equal),
            "<=" | "<" => Ok(Comparison::LessEq),
            ">=" | ">" => Ok(Comparison::GreaterEq),
            other => Err(format!("unknown comparison: {}", other)),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Equal => "=",
            Comparison::LessEq => "<=",
            Comparison::GreaterEq => ">=",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Equality,
    Inequality,
}

/// One flattened solver variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub lower: f64,
    pub upper: f64,
    /// Starting point in solver space
    pub start: f64,
    /// Index of the host parameter this element belongs to
    pub parameter: usize,
    /// Element index inside that parameter
    pub element: usize,
}

/// One flattened constraint row
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintEntry {
    pub name: String,
    pub kind: ConstraintKind,
    pub comparison: Comparison,
    /// Multiplier turning the host residual into the solver value
    pub sign: f64,
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub title: String,
    pub variables: Vec<Variable>,
    pub objectives: Vec<String>,
    pub constraints: Vec<ConstraintEntry>,
    /// Host parameter names, in order
    pub parameter_names: Vec<String>,
    /// Host constraint names, equality then inequality
    pub constraint_names: Vec<String>,
    n_eq: usize,
    sizes: Vec<usize>,
}

impl Problem {
    /// Build a fresh problem from host metadata
    pub fn build(
        title: &str,
        parameters: &[ParameterSpec],
        objectives: &[String],
        eq: &[ConstraintSpec],
        ineq: &[ConstraintSpec],
    ) -> Result<Problem, DriverError> {
        let mut variables = Vec::new();
        let mut sizes = Vec::with_capacity(parameters.len());

        for (p, spec) in parameters.iter().enumerate() {
            let kind = classify(spec)?;
            let n = spec.size();
            if spec.lower.len() != n || spec.upper.len() != n {
                return Err(DriverError::InvalidParameterType {
                    name: spec.name.clone(),
                    reason: format!(
                        "{} values but {} lower and {} upper bounds",
                        n,
                        spec.lower.len(),
                        spec.upper.len()
                    ),
                });
            }
            for i in 0..n {
                let name = spec.element_name(i);
                let (lower, upper, start) = match &kind {
                    VariableKind::Discrete(choices) => {
                        let idx = match choices.iter().position(|c| *c == spec.value[i]) {
                            Some(idx) => idx,
                            None => {
                                log::warn!(
                                    "{}: current value {} is not one of the choices, starting at {}",
                                    name,
                                    spec.value[i],
                                    choices[0]
                                );
                                0
                            }
                        };
                        (0.0, (choices.len() - 1) as f64, idx as f64)
                    }
                    VariableKind::Continuous | VariableKind::Integer => {
                        let value = spec.value[i].as_f64().ok_or_else(|| {
                            DriverError::InvalidParameterType {
                                name: name.clone(),
                                reason: format!("value {} is not numeric", spec.value[i]),
                            }
                        })?;
                        let (lower, upper) = (spec.lower[i], spec.upper[i]);
                        if lower.is_nan() || upper.is_nan() || lower > upper {
                            return Err(DriverError::InvalidParameterType {
                                name: name.clone(),
                                reason: format!("lower bound {} is not below upper bound {}", lower, upper),
                            });
                        }
                        (lower, upper, value)
                    }
                };
                variables.push(Variable {
                    name,
                    kind: kind.clone(),
                    lower,
                    upper,
                    start,
                    parameter: p,
                    element: i,
                });
            }
            sizes.push(n);
        }

        let mut constraints = Vec::new();
        let mut constraint_names = Vec::with_capacity(eq.len() + ineq.len());
        for (specs, kind) in [(eq, ConstraintKind::Equality), (ineq, ConstraintKind::Inequality)] {
            for spec in specs {
                if kind == ConstraintKind::Equality && spec.comparison != Comparison::Equal {
                    return Err(DriverError::Config(format!(
                        "equality constraint {} declared with {}",
                        spec.name, spec.comparison
                    )));
                }
                if kind == ConstraintKind::Inequality && spec.comparison == Comparison::Equal {
                    return Err(DriverError::Config(format!(
                        "inequality constraint {} declared with =",
                        spec.name
                    )));
                }
                for i in 0..spec.size {
                    let name = if spec.size == 1 {
                        spec.name.clone()
                    } else {
                        format!("{}[{}]", spec.name, i)
                    };
                    constraints.push(ConstraintEntry {
                        name,
                        kind,
                        comparison: spec.comparison,
                        sign: spec.comparison.sign(),
                    });
                }
                constraint_names.push(spec.name.clone());
            }
        }
        let n_eq = eq.iter().map(|c| c.size).sum();

        Ok(Problem {
            title: title.to_string(),
            variables,
            objectives: objectives.to_vec(),
            constraints,
            parameter_names: parameters.iter().map(|p| p.name.clone()).collect(),
            constraint_names,
            n_eq,
            sizes,
        })
    }

    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn n_objectives(&self) -> usize {
        self.objectives.len()
    }

    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of equality rows; inequality rows start at this index
    pub fn n_eq(&self) -> usize {
        self.n_eq
    }

    pub fn n_ineq(&self) -> usize {
        self.constraints.len() - self.n_eq
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.lower).collect()
    }

    pub fn upper_bounds(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.upper).collect()
    }

    /// Starting point, clamped into the bounds
    pub fn start(&self) -> Vec<f64> {
        self.variables
            .iter()
            .map(|v| v.start.clamp(v.lower, v.upper.max(v.lower)))
            .collect()
    }

    /// `true` for every variable the solver should keep integral
    pub fn integrality(&self) -> Vec<bool> {
        self.variables.iter().map(|v| v.kind.is_integral()).collect()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.variables.iter().any(|v| v.kind.is_integral())
    }

    /// Host names of every objective and constraint, in Jacobian row order
    pub fn output_names(&self) -> Vec<String> {
        self.objectives
            .iter()
            .chain(self.constraint_names.iter())
            .cloned()
            .collect()
    }

    /// Turn host residuals into signed solver values, in place
    pub fn apply_signs(&self, residuals: &mut [f64]) {
        for (r, c) in residuals.iter_mut().zip(self.constraints.iter()) {
            *r *= c.sign;
        }
    }

    /// Unpack a solver vector into host values, one `Vec<Scalar>` per parameter.
    ///
    /// Only the first `n_variables()` entries are read. Integers are rounded to
    /// nearest, discrete indices are mapped back to their choice.
    pub fn unpack(&self, x: &[f64]) -> Result<Vec<Vec<Scalar>>, DriverError> {
        let n = self.n_variables();
        if x.len() < n {
            return Err(DriverError::Solver(format!(
                "solver vector has {} entries, problem has {} variables",
                x.len(),
                n
            )));
        }
        let mut values: Vec<Vec<Scalar>> =
            self.sizes.iter().map(|&s| Vec::with_capacity(s)).collect();
        for (var, &xi) in self.variables.iter().zip(x.iter()) {
            if !xi.is_finite() {
                return Err(DriverError::Solver(format!("solver proposed {} for {}", xi, var.name)));
            }
            let value = match &var.kind {
                VariableKind::Continuous => Scalar::Float(xi),
                VariableKind::Integer => Scalar::Int(xi.round() as i64),
                VariableKind::Discrete(choices) => {
                    let idx = xi.round().clamp(0.0, (choices.len() - 1) as f64) as usize;
                    choices[idx].clone()
                }
            };
            values[var.parameter].push(value);
        }
        Ok(values)
    }
}
