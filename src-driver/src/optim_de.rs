// Native DE backend

use ndarray::Array1;

use crate::callbacks::Callbacks;
use crate::de::{DEConfigBuilder, DEIntermediate, CallbackAction, Fitness, Init, Mutation, Strategy, differential_evolution};
use crate::error::DriverError;
use crate::optimizer::{OptionValue, Optimizer, Sensitivity, Solution, scalarize, violation, warn_if_scalarized};
use crate::problem::Problem;
use crate::registry::AlgorithmInfo;

/// Settings for the native DE solver, filled from the option map
#[derive(Debug, Clone)]
pub struct NativeDe {
    info: &'static AlgorithmInfo,
    maxiter: usize,
    popsize: usize,
    tol: f64,
    atol: f64,
    mutation: Mutation,
    recombination: f64,
    strategy: Strategy,
    init: Init,
    seed: Option<u64>,
    eq_tol: f64,
    disp: bool,
}

impl NativeDe {
    pub fn new(info: &'static AlgorithmInfo) -> Self {
        Self {
            info,
            maxiter: 1000,
            popsize: 15,
            tol: 1e-6,
            atol: 0.0,
            mutation: Mutation::default(),
            recombination: 0.7,
            strategy: Strategy::Best1Bin,
            init: Init::LatinHypercube,
            seed: None,
            eq_tol: 1e-6,
            disp: false,
        }
    }
}

/// `0.8` is a fixed factor, `"0.5,1.0"` a dithering range
fn parse_mutation(name: &str, value: &OptionValue) -> Result<Mutation, DriverError> {
    match value {
        OptionValue::Text(s) => {
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            match parts.as_slice() {
                [min, max] => {
                    let min: f64 = min.parse().map_err(|_| DriverError::option(name, "bad range start"))?;
                    let max: f64 = max.parse().map_err(|_| DriverError::option(name, "bad range end"))?;
                    if !(0.0 <= min && min < max && max <= 2.0) {
                        return Err(DriverError::option(name, "range must satisfy 0 <= min < max <= 2"));
                    }
                    Ok(Mutation::Range { min, max })
                }
                _ => Err(DriverError::option(name, "expected a factor or \"min,max\"")),
            }
        }
        other => {
            let f = other.as_f64(name)?;
            if !(0.0..2.0).contains(&f) {
                return Err(DriverError::option(name, "factor must be in [0, 2)"));
            }
            Ok(Mutation::Factor(f))
        }
    }
}

impl Optimizer for NativeDe {
    fn info(&self) -> &'static AlgorithmInfo {
        self.info
    }

    fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<(), DriverError> {
        match name {
            "maxiter" => self.maxiter = value.as_usize(name)?,
            "popsize" => self.popsize = value.as_usize(name)?.max(1),
            "tol" => self.tol = value.as_f64(name)?,
            "atol" => self.atol = value.as_f64(name)?,
            "mutation" => self.mutation = parse_mutation(name, value)?,
            "recombination" => {
                let cr = value.as_f64(name)?;
                if !(0.0..=1.0).contains(&cr) {
                    return Err(DriverError::option(name, "must be in [0, 1]"));
                }
                self.recombination = cr;
            }
            "strategy" => {
                self.strategy = value
                    .as_str(name)?
                    .parse()
                    .map_err(|e: String| DriverError::option(name, e))?
            }
            "init" => {
                self.init = value
                    .as_str(name)?
                    .parse()
                    .map_err(|e: String| DriverError::option(name, e))?
            }
            "seed" => self.seed = Some(value.as_usize(name)? as u64),
            "eq_tol" => self.eq_tol = value.as_f64(name)?,
            "disp" => self.disp = value.as_bool(name)?,
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

        let bounds: Vec<(f64, f64)> = problem
            .lower_bounds()
            .into_iter()
            .zip(problem.upper_bounds())
            .collect();
        let n_eq = problem.n_eq();
        let eq_tol = self.eq_tol;

        let mut builder = DEConfigBuilder::new()
            .maxiter(self.maxiter)
            .popsize(self.popsize)
            .tol(self.tol)
            .atol(self.atol)
            .mutation(self.mutation)
            .recombination(self.recombination)
            .strategy(self.strategy)
            .init(self.init)
            .x0(Array1::from(problem.start()))
            .disp(self.disp)
            .callback(Box::new(|inter: &DEIntermediate| {
                log::debug!(
                    "de iter {:4} best={:.6e} viol={:.3e} spread={:.3e}",
                    inter.iter,
                    inter.fun,
                    inter.violation,
                    inter.convergence
                );
                CallbackAction::Continue
            }));
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        if problem.has_integer_variables() {
            builder = builder.integrality(problem.integrality());
        }

        let mut objective = |x: &Array1<f64>| -> Fitness {
            let ev = callbacks.evaluate(&x.to_vec());
            if ev.fail {
                return Fitness::failed();
            }
            Fitness::constrained(scalarize(&ev.objectives), violation(&ev.constraints, n_eq, eq_tol))
        };
        let report = differential_evolution(&mut objective, &bounds, builder.build());

        let feasible = report.violation <= 0.0;
        let message = if feasible {
            report.message.clone()
        } else {
            format!("{} (best point infeasible, violation={:.3e})", report.message, report.violation)
        };
        log::info!(
            "{}: {} after {} generations and {} evaluations",
            self.info.name,
            message,
            report.nit,
            report.nfev
        );
        Ok(Solution::new(
            self.info.name,
            report.x.to_vec(),
            report.fun,
            report.success && feasible,
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::find_algorithm_info;

    fn de() -> NativeDe {
        NativeDe::new(find_algorithm_info("optdriver:de").unwrap())
    }

    #[test]
    fn options_are_typed() {
        let mut opt = de();
        opt.set_option("maxiter", &OptionValue::Int(50)).unwrap();
        opt.set_option("strategy", &OptionValue::Text("rand1exp".into())).unwrap();
        opt.set_option("mutation", &OptionValue::Text("0.3, 0.9".into())).unwrap();
        opt.set_option("seed", &OptionValue::Int(4)).unwrap();
        assert_eq!(opt.maxiter, 50);
        assert_eq!(opt.strategy, Strategy::Rand1Exp);
        assert!(matches!(opt.mutation, Mutation::Range { min, max } if min == 0.3 && max == 0.9));
        assert_eq!(opt.seed, Some(4));

        assert!(opt.set_option("recombination", &OptionValue::Float(1.5)).is_err());
        assert!(opt.set_option("strategy", &OptionValue::Text("rand9".into())).is_err());
        assert!(opt.set_option("mutation", &OptionValue::Float(2.5)).is_err());
        // unknown names are not errors
        assert!(opt.set_option("PopSize", &OptionValue::Int(100)).is_ok());
    }
}
