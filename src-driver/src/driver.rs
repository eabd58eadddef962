use crate::callbacks::DriverCallbacks;
use crate::config::DriverConfig;
use crate::error::{DriverError, error_chain};
use crate::history::History;
use crate::host::Host;
use crate::optimizer::{OptionValue, Sensitivity, Solution};
use crate::problem::Problem;
use crate::registry::create_optimizer;

/// Runs one optimization of a [`Host`] with the configured algorithm and
/// keeps the last [`Solution`]
pub struct OptimizationDriver {
    config: DriverConfig,
    solution: Option<Solution>,
}

impl Default for OptimizationDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl OptimizationDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config, solution: None }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DriverConfig {
        &mut self.config
    }

    /// Select an algorithm; names that are not installed are rejected
    pub fn set_optimizer(&mut self, name: &str) -> Result<(), DriverError> {
        let previous = std::mem::replace(&mut self.config.optimizer, name.to_string());
        if let Err(e) = self.config.validate() {
            self.config.optimizer = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn set_option(&mut self, name: &str, value: impl Into<OptionValue>) {
        self.config.options.insert(name.to_string(), value.into());
    }

    /// Solution of the last successful run
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// Optimize `host` and leave it at the optimum.
    ///
    /// Setup errors are passed to [`Host::report_error`] and returned; failures
    /// inside the solver loop only show up in the solution counters.
    pub fn run(&mut self, host: &mut dyn Host) -> Result<&Solution, DriverError> {
        self.solution = None;
        match self.execute(host) {
            Ok(solution) => {
                if self.config.print_results {
                    println!("{}", solution);
                }
                Ok(self.solution.insert(solution))
            }
            Err(e) => {
                log::error!("optimization aborted ({}): {}", e.category(), error_chain(&e));
                host.report_error(&e);
                Err(e)
            }
        }
    }

    fn execute(&self, host: &mut dyn Host) -> Result<Solution, DriverError> {
        let config = &self.config;
        let mut optimizer = create_optimizer(&config.optimizer)?;
        let algorithm = optimizer.info().name;

        if config.initial_run {
            log::debug!("initial model run");
            host.run_iteration()?;
        }

        let problem = Problem::build(
            &config.title,
            &host.parameters(),
            &host.objectives(),
            &host.eq_constraints(),
            &host.ineq_constraints(),
        )?;
        log::info!(
            "{}: {} variables, {} objectives, {} equality and {} inequality constraints",
            problem.title,
            problem.n_variables(),
            problem.n_objectives(),
            problem.n_eq(),
            problem.n_ineq()
        );

        for (name, value) in &config.options {
            optimizer.set_option(name, value)?;
        }

        let history = History::open(config.hot_start.as_deref(), config.store_history.as_deref())?;
        let sensitivity = if config.use_solver_fd {
            Sensitivity::FiniteDifference
        } else {
            Sensitivity::Provided
        };

        let mut callbacks = DriverCallbacks::new(&mut *host, &problem, history);
        let outcome = optimizer.optimize(&problem, &mut callbacks, sensitivity);
        let counts = callbacks.finish()?;
        let mut solution = outcome?;
        if counts.replayed > 0 {
            log::info!("hot start replayed {} stored records", counts.replayed);
        }

        // Leave the host at the reported optimum
        solution.values = problem.unpack(&solution.x)?;
        solution.x.truncate(problem.n_variables());
        host.set_parameters(&solution.values)?;
        host.run_iteration()?;
        solution.objectives = host.eval_objectives()?;
        let mut constraints = host.eval_constraints()?;
        problem.apply_signs(&mut constraints);
        solution.constraints = constraints;

        solution.algorithm = algorithm.to_string();
        solution.title = problem.title.clone();
        solution.variable_names = problem.variables.iter().map(|v| v.name.clone()).collect();
        solution.parameter_names = problem.parameter_names.clone();
        solution.objective_names = problem.objectives.clone();
        solution.constraint_names = problem.constraints.iter().map(|c| c.name.clone()).collect();
        solution.evaluations = counts.evaluations;
        solution.gradients = counts.gradients;
        solution.failures = counts.failures;

        log::info!(
            "{}: {} (success={}, evaluations={}, gradients={}, failures={})",
            algorithm,
            solution.message,
            solution.success,
            solution.evaluations,
            solution.gradients,
            solution.failures
        );
        Ok(solution)
    }
}
