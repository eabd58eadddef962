// Metaheuristics backend

use std::sync::Mutex;

use metaheuristics_nature as mh;
use mh::methods::{De as MhDe, Fa as MhFa, Pso as MhPso, Rga as MhRga, Tlbo as MhTlbo};
use mh::{Bounded as MhBounded, ObjFunc as MhObjFunc, Solver as MhSolver};

use crate::callbacks::Callbacks;
use crate::error::DriverError;
use crate::optimizer::{OptionValue, Optimizer, Sensitivity, Solution, penalty, scalarize, warn_if_scalarized};
use crate::problem::Problem;
use crate::registry::AlgorithmInfo;

// ---------------- Metaheuristics objective ----------------
/// Penalized objective; the solver may evaluate from several threads, so the
/// callbacks sit behind a lock
pub struct MhObjective<'c> {
    callbacks: Mutex<&'c mut dyn Callbacks>,
    bounds: Vec<[f64; 2]>,
    n_eq: usize,
    penalty: f64,
}

impl MhBounded for MhObjective<'_> {
    fn bound(&self) -> &[[f64; 2]] {
        self.bounds.as_slice()
    }
}

impl MhObjFunc for MhObjective<'_> {
    type Ys = f64;
    fn fitness(&self, xs: &[f64]) -> Self::Ys {
        let ev = match self.callbacks.lock() {
            Ok(mut cb) => cb.evaluate(xs),
            // a poisoned lock means an earlier evaluation escaped; treat as failure
            Err(_) => return f64::INFINITY,
        };
        if ev.fail {
            return f64::INFINITY;
        }
        scalarize(&ev.objectives) + self.penalty * penalty(&ev.constraints, self.n_eq)
    }
}

pub struct MhOptimizer {
    info: &'static AlgorithmInfo,
    population: usize,
    generations: usize,
    seed: u64,
    penalty: f64,
}

impl MhOptimizer {
    pub fn new(info: &'static AlgorithmInfo) -> Self {
        Self {
            info,
            population: 50,
            generations: 200,
            seed: 0,
            penalty: 1e6,
        }
    }
}

impl Optimizer for MhOptimizer {
    fn info(&self) -> &'static AlgorithmInfo {
        self.info
    }

    fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<(), DriverError> {
        match name {
            "population" => self.population = value.as_usize(name)?.max(1),
            "generations" => self.generations = value.as_usize(name)?.max(1),
            // Estimate generations from maxeval and population
            "maxeval" => {
                let maxeval = value.as_usize(name)?;
                self.generations = maxeval.max(self.population).div_ceil(self.population);
            }
            "seed" => self.seed = value.as_usize(name)? as u64,
            "penalty" => self.penalty = value.as_f64(name)?,
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
        if sensitivity == Sensitivity::Provided {
            log::debug!("{} does not use gradients", self.info.name);
        }
        warn_if_scalarized(problem, self.info.name);
        if problem.has_integer_variables() {
            log::warn!(
                "{}: integer and discrete variables are relaxed to continuous and rounded afterwards",
                self.info.name
            );
        }

        let bounds: Vec<[f64; 2]> = problem
            .lower_bounds()
            .into_iter()
            .zip(problem.upper_bounds())
            .map(|(lo, hi)| [lo, hi])
            .collect();
        let mh_obj = MhObjective {
            callbacks: Mutex::new(callbacks),
            bounds,
            n_eq: problem.n_eq(),
            penalty: self.penalty,
        };

        // Use boxed builder to allow runtime selection with unified type
        let builder = match self.info.short_name() {
            "de" => MhSolver::build_boxed(MhDe::default(), mh_obj),
            "pso" => MhSolver::build_boxed(MhPso::default(), mh_obj),
            "rga" => MhSolver::build_boxed(MhRga::default(), mh_obj),
            "tlbo" => MhSolver::build_boxed(MhTlbo::default(), mh_obj),
            "firefly" => MhSolver::build_boxed(MhFa::default(), mh_obj),
            other => return Err(DriverError::Solver(format!("unknown metaheuristic {}", other))),
        };

        log::info!(
            "{}: population={}, generations={}, seed={}",
            self.info.name,
            self.population,
            self.generations,
            self.seed
        );

        // Avoid accessing ctx.gen directly (reserved identifier in Rust 2024).
        // Instead, count down generations via the task FnMut closure.
        let mut left = self.generations as i64;
        let solver = builder
            .seed(self.seed)
            .pop_num(self.population)
            .task(move |_| {
                left -= 1;
                left <= 0
            })
            .solve();

        let best_x = solver.as_best_xs().to_vec();
        let best_val = *solver.as_best_fit();
        let success = best_val.is_finite();
        Ok(Solution::new(
            self.info.name,
            best_x,
            best_val,
            success,
            format!("Metaheuristics({}) after {} generations", self.info.short_name(), self.generations),
        ))
    }
}
