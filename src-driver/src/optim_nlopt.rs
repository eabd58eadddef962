// NLOPT backend

use nlopt::{Algorithm, Nlopt, Target};
use std::cell::RefCell;

use crate::callbacks::{Callbacks, Evaluation, Gradient};
use crate::error::DriverError;
use crate::optimizer::{
    OptionValue, Optimizer, Sensitivity, Solution, finite_difference, scalarize, warn_if_scalarized,
};
use crate::problem::Problem;
use crate::registry::AlgorithmInfo;

fn nlopt_algorithm(short_name: &str) -> Option<Algorithm> {
    let algo = match short_name {
        "isres" => Algorithm::Isres,
        "ags" => Algorithm::Ags,
        "origdirect" => Algorithm::OrigDirect,
        "crs2lm" => Algorithm::Crs2Lm,
        "direct" => Algorithm::Direct,
        "directl" => Algorithm::DirectL,
        "stogo" => Algorithm::StoGo,
        "stogorand" => Algorithm::StoGoRand,
        "slsqp" => Algorithm::Slsqp,
        "mma" => Algorithm::Mma,
        "ccsaq" => Algorithm::Ccsaq,
        "lbfgs" => Algorithm::Lbfgs,
        "cobyla" => Algorithm::Cobyla,
        "bobyqa" => Algorithm::Bobyqa,
        "neldermead" => Algorithm::Neldermead,
        "sbplx" => Algorithm::Sbplx,
        _ => return None,
    };
    Some(algo)
}

pub struct NloptOptimizer {
    info: &'static AlgorithmInfo,
    algorithm: Algorithm,
    maxeval: usize,
    maxtime: Option<f64>,
    ftol_rel: f64,
    ftol_abs: Option<f64>,
    xtol_rel: f64,
    stopval: Option<f64>,
    population: Option<usize>,
    constraint_tol: f64,
    penalty: f64,
    fd_step: f64,
}

impl NloptOptimizer {
    pub fn new(info: &'static AlgorithmInfo) -> Result<Self, DriverError> {
        let algorithm = nlopt_algorithm(info.short_name())
            .ok_or_else(|| DriverError::Solver(format!("no NLOPT mapping for {}", info.name)))?;
        Ok(Self {
            info,
            algorithm,
            maxeval: 2_000,
            maxtime: None,
            ftol_rel: 1e-8,
            ftol_abs: None,
            xtol_rel: 1e-6,
            stopval: None,
            population: None,
            constraint_tol: 1e-8,
            penalty: 1e4,
            fd_step: 1e-6,
        })
    }
}

/// State shared by the objective and every constraint row during one run
struct Session<'c> {
    callbacks: &'c mut dyn Callbacks,
    problem: &'c Problem,
    sensitivity: Sensitivity,
    fd_step: f64,
    penalty: f64,
    fold_eq: bool,
    fold_ineq: bool,
    last: Option<(Vec<f64>, Evaluation)>,
    last_gradient: Option<(Vec<f64>, Gradient)>,
}

impl Session<'_> {
    /// NLOPT asks for the objective and each constraint at the same point
    fn evaluation(&mut self, x: &[f64]) -> Evaluation {
        if let Some((at, ev)) = &self.last {
            if at.as_slice() == x {
                return ev.clone();
            }
        }
        let ev = self.callbacks.evaluate(x);
        self.last = Some((x.to_vec(), ev.clone()));
        ev
    }

    fn gradient(&mut self, x: &[f64]) -> Gradient {
        if let Some((at, g)) = &self.last_gradient {
            if at.as_slice() == x {
                return g.clone();
            }
        }
        let ev = self.evaluation(x);
        let g = match self.sensitivity {
            Sensitivity::Provided => self.callbacks.gradient(x, &ev.objectives, &ev.constraints),
            Sensitivity::FiniteDifference => {
                finite_difference(&mut *self.callbacks, self.problem, x, &ev, self.fd_step)
            }
        };
        self.last_gradient = Some((x.to_vec(), g.clone()));
        g
    }

    fn is_folded(&self, row: usize) -> bool {
        if row < self.problem.n_eq() { self.fold_eq } else { self.fold_ineq }
    }
}

fn nlopt_objective(x: &[f64], grad: Option<&mut [f64]>, session: &mut &RefCell<Session<'_>>) -> f64 {
    let mut s = session.borrow_mut();
    let ev = s.evaluation(x);
    if ev.fail {
        if let Some(g) = grad {
            g.fill(0.0);
        }
        return f64::INFINITY;
    }
    let n_eq = s.problem.n_eq();
    let mut value = scalarize(&ev.objectives);
    for (i, &c) in ev.constraints.iter().enumerate() {
        if s.is_folded(i) {
            let v = if i < n_eq { c } else { c.min(0.0) };
            value += s.penalty * v * v;
        }
    }
    if let Some(g) = grad {
        let jac = s.gradient(x);
        g.fill(0.0);
        if !jac.fail {
            for (j, gj) in g.iter_mut().enumerate() {
                *gj = jac.objectives.column(j).sum();
            }
            for (i, &c) in ev.constraints.iter().enumerate() {
                if !s.is_folded(i) || i >= jac.constraints.nrows() {
                    continue;
                }
                let v = if i < n_eq { c } else { c.min(0.0) };
                if v != 0.0 {
                    for (j, gj) in g.iter_mut().enumerate() {
                        *gj += 2.0 * s.penalty * v * jac.constraints[[i, j]];
                    }
                }
            }
        }
    }
    value
}

/// One constraint row registered with NLOPT, which expects `c(x) <= 0`
struct Row<'s, 'c> {
    session: &'s RefCell<Session<'c>>,
    row: usize,
    /// +1 for equality rows, -1 for inequality rows (`g >= 0` becomes `-g <= 0`)
    factor: f64,
}

fn nlopt_constraint(x: &[f64], grad: Option<&mut [f64]>, row: &mut Row<'_, '_>) -> f64 {
    let mut s = row.session.borrow_mut();
    let ev = s.evaluation(x);
    let i = row.row;
    if ev.fail || i >= ev.constraints.len() {
        if let Some(g) = grad {
            g.fill(0.0);
        }
        return f64::INFINITY;
    }
    if let Some(g) = grad {
        let jac = s.gradient(x);
        if jac.fail || i >= jac.constraints.nrows() {
            g.fill(0.0);
        } else {
            for (j, gj) in g.iter_mut().enumerate() {
                *gj = row.factor * jac.constraints[[i, j]];
            }
        }
    }
    row.factor * ev.constraints[i]
}

fn solver_error(what: &str, e: impl std::fmt::Debug) -> DriverError {
    DriverError::Solver(format!("NLOPT {}: {:?}", what, e))
}

impl Optimizer for NloptOptimizer {
    fn info(&self) -> &'static AlgorithmInfo {
        self.info
    }

    fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<(), DriverError> {
        match name {
            "maxeval" => self.maxeval = value.as_usize(name)?,
            "maxtime" => self.maxtime = Some(value.as_f64(name)?),
            "ftol_rel" => self.ftol_rel = value.as_f64(name)?,
            "ftol_abs" => self.ftol_abs = Some(value.as_f64(name)?),
            "xtol_rel" => self.xtol_rel = value.as_f64(name)?,
            "stopval" => self.stopval = Some(value.as_f64(name)?),
            "population" => self.population = Some(value.as_usize(name)?),
            "constraint_tol" => self.constraint_tol = value.as_f64(name)?,
            "penalty" => self.penalty = value.as_f64(name)?,
            "fd_step" => {
                let h = value.as_f64(name)?;
                if h <= 0.0 {
                    return Err(DriverError::option(name, "step must be positive"));
                }
                self.fd_step = h;
            }
            _ => log::warn!("{}: ignoring unknown option {}={}", self.info.name, name, value),
        }
        Ok(())
    }

    fn optimize(
        &mut self,
        problem: &Problem,
        callbacks: &mut dyn Callbacks,
        sensitivity: Sensitivity,
    ) -> Result<Solution, DriverError> {
        let n = problem.n_variables();
        warn_if_scalarized(problem, self.info.name);
        if problem.has_integer_variables() {
            log::warn!(
                "{}: integer and discrete variables are relaxed to continuous and rounded afterwards",
                self.info.name
            );
        }

        let fold_ineq = !self.info.supports_nonlinear_constraints;
        let fold_eq = !self.info.supports_equality_constraints;
        if (fold_ineq && problem.n_ineq() > 0) || (fold_eq && problem.n_eq() > 0) {
            log::info!(
                "{}: folding unsupported constraints into a quadratic penalty (weight {:.1e})",
                self.info.name,
                self.penalty
            );
        }

        let session = RefCell::new(Session {
            callbacks,
            problem,
            sensitivity,
            fd_step: self.fd_step,
            penalty: self.penalty,
            fold_eq,
            fold_ineq,
            last: None,
            last_gradient: None,
        });

        let mut optimizer = Nlopt::new(self.algorithm, n, nlopt_objective, Target::Minimize, &session);
        optimizer
            .set_lower_bounds(&problem.lower_bounds())
            .map_err(|e| solver_error("lower bounds", e))?;
        optimizer
            .set_upper_bounds(&problem.upper_bounds())
            .map_err(|e| solver_error("upper bounds", e))?;

        for (i, entry) in problem.constraints.iter().enumerate() {
            let equality = i < problem.n_eq();
            if (equality && fold_eq) || (!equality && fold_ineq) {
                continue;
            }
            let row = Row {
                session: &session,
                row: i,
                factor: if equality { 1.0 } else { -1.0 },
            };
            let registered = if equality {
                optimizer.add_equality_constraint(nlopt_constraint, row, self.constraint_tol)
            } else {
                optimizer.add_inequality_constraint(nlopt_constraint, row, self.constraint_tol)
            };
            registered.map_err(|e| solver_error(&format!("constraint {}", entry.name), e))?;
        }

        let _ = optimizer.set_maxeval(self.maxeval as u32);
        let _ = optimizer.set_ftol_rel(self.ftol_rel);
        let _ = optimizer.set_xtol_rel(self.xtol_rel);
        if let Some(t) = self.maxtime {
            let _ = optimizer.set_maxtime(t);
        }
        if let Some(t) = self.ftol_abs {
            let _ = optimizer.set_ftol_abs(t);
        }
        if let Some(v) = self.stopval {
            let _ = optimizer.set_stopval(v);
        }
        if let Some(p) = self.population {
            let _ = optimizer.set_population(p);
        }

        log::info!(
            "{}: {} variables, {} constraints, maxeval={}, gradients={:?}",
            self.info.name,
            n,
            problem.n_constraints(),
            self.maxeval,
            sensitivity
        );

        let mut x = problem.start();
        let result = optimizer.optimize(&mut x);
        drop(optimizer);

        let solution = match result {
            Ok((status, val)) => Solution::new(self.info.name, x, val, true, format!("{:?}", status)),
            Err((e, val)) => {
                log::warn!("{} stopped with {:?} (f={:.6e})", self.info.name, e, val);
                Solution::new(self.info.name, x, val, false, format!("{:?}", e))
            }
        };
        Ok(solution)
    }
}
