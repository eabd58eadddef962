//! An in-memory [`Host`]: parameters are named value vectors, objectives and
//! constraints are closures over them.
//!
//! Derivatives come from central differences over the numeric parameter
//! elements. Parameters with enumerated choices, booleans and text get zero
//! columns.

use ndarray::Array2;
use std::collections::HashMap;

use crate::error::HostError;
use crate::host::{ConstraintSpec, Host};
use crate::parameter::ParameterSpec;
use crate::problem::Comparison;
use crate::value::{Scalar, ValueType};

type ScalarFn = Box<dyn Fn(&State) -> Result<f64, HostError> + Send>;
type VectorFn = Box<dyn Fn(&State) -> Result<Vec<f64>, HostError> + Send>;

/// Current parameter values of a [`Model`]
#[derive(Debug, Clone, Default)]
pub struct State {
    values: HashMap<String, Vec<Scalar>>,
}

impl State {
    pub fn get(&self, name: &str) -> Result<&[Scalar], HostError> {
        self.values
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| HostError::UnknownName(name.to_string()))
    }

    /// First element of a parameter as a number
    pub fn scalar(&self, name: &str) -> Result<f64, HostError> {
        self.get(name)?
            .first()
            .and_then(Scalar::as_f64)
            .ok_or_else(|| HostError::NotNumeric(name.to_string()))
    }

    pub fn vector(&self, name: &str) -> Result<Vec<f64>, HostError> {
        self.get(name)?
            .iter()
            .map(|v| v.as_f64().ok_or_else(|| HostError::NotNumeric(name.to_string())))
            .collect()
    }

    pub fn set(&mut self, name: &str, value: Vec<Scalar>) {
        self.values.insert(name.to_string(), value);
    }
}

struct Constraint {
    spec: ConstraintSpec,
    /// Returns `lhs - rhs` per element
    residual: VectorFn,
}

/// Builder-style in-memory model
pub struct Model {
    parameters: Vec<ParameterSpec>,
    state: State,
    objectives: Vec<(String, ScalarFn)>,
    eq: Vec<Constraint>,
    ineq: Vec<Constraint>,
    /// Outputs of the last run, by name
    outputs: Option<HashMap<String, Vec<f64>>>,
    executions: usize,
    fd_step: f64,
    /// Errors reported by a driver
    reported: Vec<String>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
            state: State::default(),
            objectives: Vec::new(),
            eq: Vec::new(),
            ineq: Vec::new(),
            outputs: None,
            executions: 0,
            fd_step: 1e-6,
            reported: Vec::new(),
        }
    }

    pub fn parameter(mut self, spec: ParameterSpec) -> Self {
        self.state.set(&spec.name, spec.value.clone());
        self.parameters.push(spec);
        self
    }

    pub fn objective<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&State) -> Result<f64, HostError> + Send + 'static,
    {
        self.objectives.push((name.to_string(), Box::new(f)));
        self
    }

    /// Scalar constraint `lhs(state) <cmp> rhs`
    pub fn constraint<F>(self, name: &str, lhs: F, comparison: Comparison, rhs: f64) -> Self
    where
        F: Fn(&State) -> Result<f64, HostError> + Send + 'static,
    {
        self.vector_constraint(name, 1, move |s| Ok(vec![lhs(s)?]), comparison, rhs)
    }

    /// Vector constraint, every element compared against the same `rhs`
    pub fn vector_constraint<F>(mut self, name: &str, size: usize, lhs: F, comparison: Comparison, rhs: f64) -> Self
    where
        F: Fn(&State) -> Result<Vec<f64>, HostError> + Send + 'static,
    {
        let residual: VectorFn = Box::new(move |s: &State| -> Result<Vec<f64>, HostError> {
            Ok(lhs(s)?.into_iter().map(|v| v - rhs).collect())
        });
        let constraint = Constraint {
            spec: ConstraintSpec::vector(name, size, comparison),
            residual,
        };
        if comparison == Comparison::Equal {
            self.eq.push(constraint);
        } else {
            self.ineq.push(constraint);
        }
        self
    }

    /// Relative step of the central differences
    pub fn fd_step(mut self, step: f64) -> Self {
        self.fd_step = step;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Number of completed `run_iteration` calls
    pub fn executions(&self) -> usize {
        self.executions
    }

    /// Errors passed to `report_error`, as `category: message`
    pub fn reported_errors(&self) -> &[String] {
        &self.reported
    }

    fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.eq.iter().chain(self.ineq.iter())
    }

    fn compute(&self, state: &State) -> Result<HashMap<String, Vec<f64>>, HostError> {
        let mut out = HashMap::new();
        for (name, f) in &self.objectives {
            out.insert(name.clone(), vec![f(state)?]);
        }
        for c in self.constraints() {
            let values = (c.residual)(state)?;
            if values.len() != c.spec.size {
                return Err(HostError::Shape {
                    what: c.spec.name.clone(),
                    expected: c.spec.size,
                    got: values.len(),
                });
            }
            out.insert(c.spec.name.clone(), values);
        }
        Ok(out)
    }

    fn outputs(&self) -> Result<&HashMap<String, Vec<f64>>, HostError> {
        self.outputs.as_ref().ok_or(HostError::NotEvaluated)
    }

    fn flatten(outputs: &HashMap<String, Vec<f64>>, of: &[String]) -> Result<Vec<f64>, HostError> {
        let mut flat = Vec::new();
        for name in of {
            let values = outputs.get(name).ok_or_else(|| HostError::UnknownName(name.clone()))?;
            flat.extend_from_slice(values);
        }
        Ok(flat)
    }

    fn spec(&self, name: &str) -> Result<&ParameterSpec, HostError> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| HostError::UnknownName(name.to_string()))
    }
}

fn is_differentiable(spec: &ParameterSpec) -> bool {
    spec.choices.is_none() && matches!(spec.value_type, ValueType::Float | ValueType::Integer)
}

impl Host for Model {
    fn parameters(&self) -> Vec<ParameterSpec> {
        // report the live values, not the ones given at build time
        self.parameters
            .iter()
            .map(|p| {
                let mut spec = p.clone();
                if let Ok(value) = self.state.get(&p.name) {
                    spec.value = value.to_vec();
                }
                spec
            })
            .collect()
    }

    fn objectives(&self) -> Vec<String> {
        self.objectives.iter().map(|(name, _)| name.clone()).collect()
    }

    fn eq_constraints(&self) -> Vec<ConstraintSpec> {
        self.eq.iter().map(|c| c.spec.clone()).collect()
    }

    fn ineq_constraints(&self) -> Vec<ConstraintSpec> {
        self.ineq.iter().map(|c| c.spec.clone()).collect()
    }

    fn set_parameters(&mut self, values: &[Vec<Scalar>]) -> Result<(), HostError> {
        if values.len() != self.parameters.len() {
            return Err(HostError::Shape {
                what: "parameters".to_string(),
                expected: self.parameters.len(),
                got: values.len(),
            });
        }
        for (spec, value) in self.parameters.iter().zip(values) {
            if value.len() != spec.size() {
                return Err(HostError::Shape {
                    what: spec.name.clone(),
                    expected: spec.size(),
                    got: value.len(),
                });
            }
        }
        for (spec, value) in self.parameters.iter().zip(values) {
            self.state.set(&spec.name, value.clone());
        }
        Ok(())
    }

    fn run_iteration(&mut self) -> Result<(), HostError> {
        self.outputs = None;
        let outputs = self.compute(&self.state)?;
        self.outputs = Some(outputs);
        self.executions += 1;
        Ok(())
    }

    fn eval_objectives(&self) -> Result<Vec<f64>, HostError> {
        let names = self.objectives();
        Self::flatten(self.outputs()?, &names)
    }

    fn eval_constraints(&self) -> Result<Vec<f64>, HostError> {
        let names: Vec<String> = self.constraints().map(|c| c.spec.name.clone()).collect();
        Self::flatten(self.outputs()?, &names)
    }

    fn calc_gradient(&mut self, wrt: &[String], of: &[String]) -> Result<Array2<f64>, HostError> {
        let rows = Self::flatten(self.outputs()?, of)?.len();
        let mut columns = Vec::new();
        for name in wrt {
            let spec = self.spec(name)?;
            columns.push((name.clone(), spec.size(), is_differentiable(spec)));
        }
        let n_cols: usize = columns.iter().map(|(_, size, _)| size).sum();

        let mut jac = Array2::zeros((rows, n_cols));
        let mut probe = self.state.clone();
        let mut col = 0;
        for (name, size, differentiable) in columns {
            if !differentiable {
                col += size;
                continue;
            }
            let base = self.state.vector(&name)?;
            for i in 0..size {
                let h = self.fd_step * base[i].abs().max(1.0);
                let mut shifted = base.clone();

                shifted[i] = base[i] + h;
                probe.set(&name, shifted.iter().map(|&v| Scalar::Float(v)).collect());
                let plus = Self::flatten(&self.compute(&probe)?, of)?;

                shifted[i] = base[i] - h;
                probe.set(&name, shifted.iter().map(|&v| Scalar::Float(v)).collect());
                let minus = Self::flatten(&self.compute(&probe)?, of)?;

                for (r, (p, m)) in plus.iter().zip(minus.iter()).enumerate() {
                    jac[[r, col]] = (p - m) / (2.0 * h);
                }
                col += 1;
            }
            // restore before moving to the next parameter
            if let Ok(value) = self.state.get(&name) {
                probe.set(&name, value.to_vec());
            }
        }
        Ok(jac)
    }

    fn report_error(&mut self, error: &crate::error::DriverError) {
        self.reported.push(format!("{}: {}", error.category(), crate::error::error_chain(error)));
    }
}
