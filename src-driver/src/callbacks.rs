//! The evaluate/gradient boundary between a solver and the host.
//!
//! Solvers only ever see [`Evaluation`] and [`Gradient`] values. Host errors
//! and panics are caught here, logged with the offending point, and turned
//! into `fail = true`; they never unwind into solver code.

use ndarray::{Array2, s};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{DriverError, error_chain};
use crate::history::History;
use crate::host::Host;
use crate::problem::Problem;

/// Result of one evaluate callback
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    pub objectives: Vec<f64>,
    /// Signed constraint values, equality rows first
    pub constraints: Vec<f64>,
    pub fail: bool,
}

/// Result of one gradient callback
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    /// n_objectives x n_variables
    pub objectives: Array2<f64>,
    /// n_constraints x n_variables, same signs as the constraint values
    pub constraints: Array2<f64>,
    pub fail: bool,
}

impl Gradient {
    pub fn failed(n_variables: usize) -> Self {
        Self {
            objectives: Array2::zeros((0, n_variables)),
            constraints: Array2::zeros((0, n_variables)),
            fail: true,
        }
    }
}

/// What a solver may call back into
pub trait Callbacks: Send {
    fn evaluate(&mut self, x: &[f64]) -> Evaluation;

    /// `f` and `g` are the solver's values at `x`; implementations may ignore them
    fn gradient(&mut self, x: &[f64], f: &[f64], g: &[f64]) -> Gradient;
}

/// Call counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub evaluations: usize,
    pub gradients: usize,
    pub failures: usize,
    pub replayed: usize,
}

/// [`Callbacks`] backed by a [`Host`] and the problem layout
pub struct DriverCallbacks<'a> {
    host: &'a mut dyn Host,
    problem: &'a Problem,
    history: Option<History>,
    /// Point at which the host state was last computed
    current: Option<Vec<f64>>,
    counts: CallCounts,
}

impl<'a> DriverCallbacks<'a> {
    pub fn new(host: &'a mut dyn Host, problem: &'a Problem, history: Option<History>) -> Self {
        Self {
            host,
            problem,
            history,
            current: None,
            counts: CallCounts::default(),
        }
    }

    pub fn counts(&self) -> CallCounts {
        self.counts
    }

    /// Flush the history file and return the call counters
    pub fn finish(self) -> Result<CallCounts, DriverError> {
        let mut counts = self.counts;
        if let Some(history) = self.history {
            counts.replayed = history.replayed();
            history.finish()?;
        }
        Ok(counts)
    }

    fn declared<'x>(&self, x: &'x [f64]) -> Result<&'x [f64], String> {
        let n = self.problem.n_variables();
        if x.len() < n {
            return Err(format!("got {} values for {} variables", x.len(), n));
        }
        Ok(&x[..n])
    }

    /// Move the host to `x` and run the model
    fn run_at(&mut self, x: &[f64]) -> Result<(), DriverError> {
        self.current = None;
        let values = self.problem.unpack(x)?;
        self.host.set_parameters(&values)?;
        self.host.run_iteration()?;
        self.current = Some(x.to_vec());
        Ok(())
    }

    fn try_evaluate(&mut self, x: &[f64], out: &mut Evaluation) -> Result<(), DriverError> {
        self.run_at(x)?;
        out.objectives = self.host.eval_objectives()?;
        let mut constraints = self.host.eval_constraints()?;
        if constraints.len() != self.problem.n_constraints() {
            return Err(DriverError::Solver(format!(
                "host returned {} constraint values, expected {}",
                constraints.len(),
                self.problem.n_constraints()
            )));
        }
        self.problem.apply_signs(&mut constraints);
        out.constraints = constraints;
        Ok(())
    }

    fn try_gradient(&mut self, x: &[f64]) -> Result<Gradient, DriverError> {
        if self.current.as_deref() != Some(x) {
            self.run_at(x)?;
        }
        let wrt = self.problem.parameter_names.clone();
        let of = self.problem.output_names();
        let jac = self.host.calc_gradient(&wrt, &of)?;

        let n_obj = self.problem.n_objectives();
        let rows = n_obj + self.problem.n_constraints();
        let cols = self.problem.n_variables();
        if jac.dim() != (rows, cols) {
            return Err(DriverError::Solver(format!(
                "Jacobian has shape {:?}, expected ({}, {})",
                jac.dim(),
                rows,
                cols
            )));
        }
        let objectives = jac.slice(s![..n_obj, ..]).to_owned();
        let mut constraints = jac.slice(s![n_obj.., ..]).to_owned();
        for (mut row, entry) in constraints.rows_mut().into_iter().zip(self.problem.constraints.iter()) {
            row *= entry.sign;
        }
        Ok(Gradient {
            objectives,
            constraints,
            fail: false,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl Callbacks for DriverCallbacks<'_> {
    fn evaluate(&mut self, x: &[f64]) -> Evaluation {
        self.counts.evaluations += 1;
        let x = match self.declared(x) {
            Ok(x) => x,
            Err(reason) => {
                self.counts.failures += 1;
                let err = DriverError::EvaluationFailure { x: x.to_vec(), reason };
                log::error!("{}", err);
                return Evaluation {
                    fail: true,
                    ..Default::default()
                };
            }
        };
        if let Some(stored) = self.history.as_mut().and_then(|h| h.replay_eval(x)) {
            // the host was not moved, so its state no longer matches any point
            self.current = None;
            return stored;
        }

        let mut out = Evaluation::default();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_evaluate(x, &mut out)));
        let reason = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(error_chain(&e)),
            Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
        };
        if let Some(reason) = reason {
            self.counts.failures += 1;
            self.current = None;
            out.fail = true;
            let err = DriverError::EvaluationFailure { x: x.to_vec(), reason };
            log::error!("{}", err);
        } else {
            log::debug!("eval {:?} -> f={:?} g={:?}", x, out.objectives, out.constraints);
        }
        if let Some(history) = self.history.as_mut() {
            history.record_eval(x, &out);
        }
        out
    }

    fn gradient(&mut self, x: &[f64], _f: &[f64], _g: &[f64]) -> Gradient {
        self.counts.gradients += 1;
        let n = self.problem.n_variables();
        let x = match self.declared(x) {
            Ok(x) => x,
            Err(reason) => {
                self.counts.failures += 1;
                log::error!("{}", DriverError::GradientFailure { x: x.to_vec(), reason });
                return Gradient::failed(n);
            }
        };
        if let Some(stored) = self.history.as_mut().and_then(|h| h.replay_gradient(x)) {
            return stored;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_gradient(x)));
        let result = match outcome {
            Ok(Ok(gradient)) => Ok(gradient),
            Ok(Err(e)) => Err(error_chain(&e)),
            Err(payload) => Err(format!("panic: {}", panic_message(payload.as_ref()))),
        };
        let gradient = match result {
            Ok(gradient) => gradient,
            Err(reason) => {
                self.counts.failures += 1;
                self.current = None;
                log::error!("{}", DriverError::GradientFailure { x: x.to_vec(), reason });
                Gradient::failed(n)
            }
        };
        if let Some(history) = self.history.as_mut() {
            history.record_gradient(x, &gradient);
        }
        gradient
    }
}
