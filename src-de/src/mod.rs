//! Differential Evolution (DE) global optimizer in pure Rust using ndarray
//!
//! This is the native backend of `optdriver`. It follows the shape of
//! SciPy's `scipy.optimize.differential_evolution` with a few changes needed
//! by a driver that talks to an external model:
//!
//! - The objective is `FnMut` and evaluated sequentially, one trial at a time
//! - Each evaluation returns a [`Fitness`] (value + constraint violation);
//!   selection uses feasibility rules instead of penalty weights
//! - Optional integrality mask to round decision variables to nearest integer
//! - Box constraints (lower/upper bounds), fixed variables when lower == upper
//! - Strategies: best1, rand1, currenttobest1, best2 with bin/exp crossover
//! - Mutation as a fixed factor or dithering in a range [min,max)
//! - Initialization: Latin Hypercube Sampling (LHS) or random uniform
//! - Optional initial guess `x0` replacing the last member after init
//! - Convergence by std(pop_f) <= atol + tol * |mean(pop_f)| over a feasible population

#![allow(missing_docs)]
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub mod apply_integrality;
pub mod distinct_indices;
pub mod fitness;
pub mod init_latin_hypercube;
pub mod init_random;

pub mod mutant_best1;
pub mod mutant_best2;
pub mod mutant_current_to_best1;
pub mod mutant_rand1;

pub mod crossover_binomial;
pub mod crossover_exponential;

pub mod differential_evolution;
pub use differential_evolution::differential_evolution;
pub use fitness::Fitness;

/// Differential Evolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
	Best1Bin,
	Best1Exp,
	Rand1Bin,
	Rand1Exp,
	CurrentToBest1Bin,
	CurrentToBest1Exp,
	Best2Bin,
	Best2Exp,
}

impl Strategy {
	fn crossover(self) -> Crossover {
		match self {
			Strategy::Best1Bin
			| Strategy::Rand1Bin
			| Strategy::CurrentToBest1Bin
			| Strategy::Best2Bin => Crossover::Binomial,
			Strategy::Best1Exp
			| Strategy::Rand1Exp
			| Strategy::CurrentToBest1Exp
			| Strategy::Best2Exp => Crossover::Exponential,
		}
	}
}

impl FromStr for Strategy {
	type Err = String;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let t = s.to_lowercase();
		match t.as_str() {
			"best1bin" | "best1" => Ok(Strategy::Best1Bin),
			"best1exp" => Ok(Strategy::Best1Exp),
			"rand1bin" | "rand1" => Ok(Strategy::Rand1Bin),
			"rand1exp" => Ok(Strategy::Rand1Exp),
			"currenttobest1bin" | "current-to-best1bin" | "current_to_best1bin" => {
				Ok(Strategy::CurrentToBest1Bin)
			}
			"currenttobest1exp" | "current-to-best1exp" | "current_to_best1exp" => {
				Ok(Strategy::CurrentToBest1Exp)
			}
			"best2bin" | "best2" => Ok(Strategy::Best2Bin),
			"best2exp" => Ok(Strategy::Best2Exp),
			_ => Err(format!("unknown strategy: {}", s)),
		}
	}
}

/// Crossover type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
	/// Binomial (uniform) crossover
	Binomial,
	/// Exponential crossover
	Exponential,
}

/// Mutation setting: either a fixed factor or a uniform range (dithering)
#[derive(Debug, Clone, Copy)]
pub enum Mutation {
	/// Fixed mutation factor F in [0, 2)
	Factor(f64),
	/// Dithering range [min, max) with 0 <= min < max <= 2
	Range { min: f64, max: f64 },
}

impl Default for Mutation {
	fn default() -> Self {
		Mutation::Range { min: 0.5, max: 1.0 }
	}
}

impl Mutation {
	fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
		match *self {
			Mutation::Factor(f) => f,
			Mutation::Range { min, max } => rng.random_range(min..max),
		}
	}
}

/// Initialization scheme for the population
#[derive(Debug, Clone, Copy, Default)]
pub enum Init {
	#[default]
	LatinHypercube,
	Random,
}

impl FromStr for Init {
	type Err = String;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"latinhypercube" | "latin_hypercube" | "lhs" => Ok(Init::LatinHypercube),
			"random" => Ok(Init::Random),
			_ => Err(format!("unknown init scheme: {}", s)),
		}
	}
}

/// Configuration for the Differential Evolution optimizer
pub struct DEConfig {
	pub maxiter: usize,
	pub popsize: usize, // total NP = popsize * n_params_free
	pub tol: f64,
	pub atol: f64,
	pub mutation: Mutation,
	pub recombination: f64, // CR in [0,1]
	pub strategy: Strategy,
	pub init: Init,
	pub seed: Option<u64>,
	/// Optional integrality mask; true => variable is integer-constrained
	pub integrality: Option<Vec<bool>>,
	/// Optional initial guess inserted into the population after init
	pub x0: Option<Array1<f64>>,
	/// Log best objective at each iteration
	pub disp: bool,
	/// Optional per-iteration callback (may stop early)
	pub callback: Option<Box<dyn FnMut(&DEIntermediate) -> CallbackAction>>,
}

impl Default for DEConfig {
	fn default() -> Self {
		Self {
			maxiter: 1000,
			popsize: 15,
			tol: 1e-2,
			atol: 0.0,
			mutation: Mutation::default(),
			recombination: 0.7,
			strategy: Strategy::Best1Bin,
			init: Init::default(),
			seed: None,
			integrality: None,
			x0: None,
			disp: false,
			callback: None,
		}
	}
}

impl fmt::Debug for DEConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DEConfig")
			.field("maxiter", &self.maxiter)
			.field("popsize", &self.popsize)
			.field("tol", &self.tol)
			.field("atol", &self.atol)
			.field("mutation", &self.mutation)
			.field("recombination", &self.recombination)
			.field("strategy", &self.strategy)
			.field("init", &self.init)
			.field("seed", &self.seed)
			.field("integrality", &self.integrality)
			.field("callback", &self.callback.is_some())
			.finish()
	}
}

/// Fluent builder for `DEConfig` for ergonomic configuration.
#[derive(Default)]
pub struct DEConfigBuilder {
	cfg: DEConfig,
}
impl DEConfigBuilder {
	pub fn new() -> Self {
		Self { cfg: DEConfig::default() }
	}
	pub fn maxiter(mut self, v: usize) -> Self {
		self.cfg.maxiter = v;
		self
	}
	pub fn popsize(mut self, v: usize) -> Self {
		self.cfg.popsize = v;
		self
	}
	pub fn tol(mut self, v: f64) -> Self {
		self.cfg.tol = v;
		self
	}
	pub fn atol(mut self, v: f64) -> Self {
		self.cfg.atol = v;
		self
	}
	pub fn mutation(mut self, v: Mutation) -> Self {
		self.cfg.mutation = v;
		self
	}
	pub fn recombination(mut self, v: f64) -> Self {
		self.cfg.recombination = v;
		self
	}
	pub fn strategy(mut self, v: Strategy) -> Self {
		self.cfg.strategy = v;
		self
	}
	pub fn init(mut self, v: Init) -> Self {
		self.cfg.init = v;
		self
	}
	pub fn seed(mut self, v: u64) -> Self {
		self.cfg.seed = Some(v);
		self
	}
	pub fn integrality(mut self, v: Vec<bool>) -> Self {
		self.cfg.integrality = Some(v);
		self
	}
	pub fn x0(mut self, v: Array1<f64>) -> Self {
		self.cfg.x0 = Some(v);
		self
	}
	pub fn disp(mut self, v: bool) -> Self {
		self.cfg.disp = v;
		self
	}
	pub fn callback(mut self, cb: Box<dyn FnMut(&DEIntermediate) -> CallbackAction>) -> Self {
		self.cfg.callback = Some(cb);
		self
	}
	pub fn build(self) -> DEConfig {
		self.cfg
	}
}

/// Result/Report of a DE optimization run
#[derive(Clone)]
pub struct DEReport {
	pub x: Array1<f64>,
	pub fun: f64,
	/// Constraint violation of `x` (0 when feasible)
	pub violation: f64,
	pub success: bool,
	pub message: String,
	pub nit: usize,
	pub nfev: usize,
	pub population: Array2<f64>,
	pub population_energies: Array1<f64>,
}

impl fmt::Debug for DEReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DEReport")
			.field("x", &format!("len={}", self.x.len()))
			.field("fun", &self.fun)
			.field("violation", &self.violation)
			.field("success", &self.success)
			.field("message", &self.message)
			.field("nit", &self.nit)
			.field("nfev", &self.nfev)
			.field(
				"population",
				&format!("{}x{}", self.population.nrows(), self.population.ncols()),
			)
			.finish()
	}
}

/// Information passed to callback after each generation
pub struct DEIntermediate {
	pub x: Array1<f64>,
	pub fun: f64,
	pub violation: f64,
	pub convergence: f64, // measured as std(pop_f)
	pub iter: usize,
}

/// Action returned by callback
pub enum CallbackAction {
	Continue,
	Stop,
}

/// Differential Evolution optimizer
pub struct DifferentialEvolution<'a, F>
where
	F: FnMut(&Array1<f64>) -> Fitness,
{
	func: &'a mut F,
	lower: Array1<f64>,
	upper: Array1<f64>,
	config: DEConfig,
}

impl<'a, F> DifferentialEvolution<'a, F>
where
	F: FnMut(&Array1<f64>) -> Fitness,
{
	/// Create a new DE optimizer with objective `func` and bounds [lower, upper]
	pub fn new(func: &'a mut F, lower: Array1<f64>, upper: Array1<f64>) -> Self {
		assert_eq!(lower.len(), upper.len(), "lower/upper size mismatch");
		Self { func, lower, upper, config: DEConfig::default() }
	}

	/// Mutable access to configuration
	pub fn config_mut(&mut self) -> &mut DEConfig {
		&mut self.config
	}

	fn evaluate(&mut self, x: &Array1<f64>) -> Fitness {
		let fit = (self.func)(x);
		if fit.value.is_nan() { Fitness::failed() } else { fit }
	}

	fn prepare(&self, x: &mut Array1<f64>) {
		for j in 0..x.len() {
			x[j] = x[j].clamp(self.lower[j], self.upper[j]);
		}
		if let Some(mask) = &self.config.integrality {
			apply_integrality::apply_integrality(x, mask, &self.lower, &self.upper);
		}
	}

	/// Run the optimization and return a report
	pub fn solve(&mut self) -> DEReport {
		use crossover_binomial::binomial_crossover;
		use crossover_exponential::exponential_crossover;
		use init_latin_hypercube::init_latin_hypercube;
		use init_random::init_random;
		use mutant_best1::mutant_best1;
		use mutant_best2::mutant_best2;
		use mutant_current_to_best1::mutant_current_to_best1;
		use mutant_rand1::mutant_rand1;

		let n = self.lower.len();

		// Identify fixed (equal-bounds) and free variables
		let is_free: Vec<bool> =
			(0..n).map(|i| (self.upper[i] - self.lower[i]).abs() > 0.0).collect();
		let n_free = is_free.iter().filter(|&&b| b).count();
		if n_free == 0 {
			let mut x_eval = self.lower.clone();
			self.prepare(&mut x_eval);
			let fit = self.evaluate(&x_eval);
			return DEReport {
				x: x_eval,
				fun: fit.value,
				violation: fit.violation,
				success: true,
				message: "All variables fixed by bounds".into(),
				nit: 0,
				nfev: 1,
				population: Array2::zeros((1, n)),
				population_energies: Array1::from(vec![fit.value]),
			};
		}

		// mutants need at least 5 distinct partners for best2
		let npop = (self.config.popsize * n_free).max(6);

		if self.config.disp {
			log::info!(
				"DE init: {} dimensions ({} free), population={}, maxiter={}",
				n,
				n_free,
				npop,
				self.config.maxiter
			);
			log::info!(
				"  strategy: {:?}, mutation: {:?}, CR={:.3}, tol={:.2e}, atol={:.2e}",
				self.config.strategy,
				self.config.mutation,
				self.config.recombination,
				self.config.tol,
				self.config.atol
			);
		}

		let mut rng: StdRng = match self.config.seed {
			Some(s) => StdRng::seed_from_u64(s),
			None => {
				let mut thread_rng = rand::rng();
				StdRng::from_rng(&mut thread_rng)
			}
		};

		let mut pop = match self.config.init {
			Init::LatinHypercube => {
				init_latin_hypercube(n, npop, &self.lower, &self.upper, &is_free, &mut rng)
			}
			Init::Random => init_random(n, npop, &self.lower, &self.upper, &is_free, &mut rng),
		};

		// x0 replaces the last member
		if let Some(x0) = self.config.x0.clone() {
			if x0.len() == n {
				pop.row_mut(npop - 1).assign(&x0.view());
			} else {
				log::warn!("ignoring x0 of length {} for a {}-dimensional problem", x0.len(), n);
			}
		}

		let mut nfev: usize = 0;
		let mut fits: Vec<Fitness> = Vec::with_capacity(npop);
		for i in 0..npop {
			let mut x = pop.row(i).to_owned();
			self.prepare(&mut x);
			pop.row_mut(i).assign(&x);
			fits.push(self.evaluate(&x));
			nfev += 1;
		}

		let mut best_idx = fitness::best_index(&fits);
		if self.config.disp {
			log::info!(
				"DE iter {:4}  best_f={:.6e} viol={:.3e}",
				0,
				fits[best_idx].value,
				fits[best_idx].violation
			);
		}

		let crossover = self.config.strategy.crossover();
		let mut success = false;
		let mut message = String::new();
		let mut nit = 0;

		for iter in 1..=self.config.maxiter {
			nit = iter;
			let mut accepted = 0usize;

			for i in 0..npop {
				let f = self.config.mutation.sample(&mut rng);
				let cr = self.config.recombination;

				let mutant = match self.config.strategy {
					Strategy::Best1Bin | Strategy::Best1Exp => {
						mutant_best1(i, &pop, best_idx, f, &mut rng)
					}
					Strategy::Rand1Bin | Strategy::Rand1Exp => mutant_rand1(i, &pop, f, &mut rng),
					Strategy::CurrentToBest1Bin | Strategy::CurrentToBest1Exp => {
						mutant_current_to_best1(i, &pop, best_idx, f, &mut rng)
					}
					Strategy::Best2Bin | Strategy::Best2Exp => {
						mutant_best2(i, &pop, best_idx, f, &mut rng)
					}
				};

				let target = pop.row(i).to_owned();
				let mut trial = match crossover {
					Crossover::Binomial => binomial_crossover(&target, &mutant, cr, &mut rng),
					Crossover::Exponential => {
						exponential_crossover(&target, &mutant, cr, &mut rng)
					}
				};
				for j in 0..n {
					if !is_free[j] {
						trial[j] = self.lower[j];
					}
				}
				self.prepare(&mut trial);

				let trial_fit = self.evaluate(&trial);
				nfev += 1;

				// Selection: deferred updating is not needed for sequential evaluation
				if !fits[i].is_better_than(&trial_fit) {
					pop.row_mut(i).assign(&trial.view());
					fits[i] = trial_fit;
					accepted += 1;
					if fits[i].is_better_than(&fits[best_idx]) {
						best_idx = i;
					}
				}
			}

			let best = fits[best_idx];
			let convergence = fitness::population_spread(&fits);

			if self.config.disp {
				log::info!(
					"DE iter {:4}  best_f={:.6e} viol={:.3e} std={:.3e} accepted={}/{}",
					iter,
					best.value,
					best.violation,
					convergence.unwrap_or(f64::INFINITY),
					accepted,
					npop
				);
			}

			if let Some(cb) = self.config.callback.as_mut() {
				let intermediate = DEIntermediate {
					x: pop.row(best_idx).to_owned(),
					fun: best.value,
					violation: best.violation,
					convergence: convergence.unwrap_or(f64::INFINITY),
					iter,
				};
				if let CallbackAction::Stop = cb(&intermediate) {
					success = true;
					message = "Optimization stopped by callback".to_string();
					break;
				}
			}

			// Only a fully feasible population can be considered converged
			if let Some(std) = convergence {
				let mean = fits.iter().map(|f| f.value).sum::<f64>() / npop as f64;
				let threshold = self.config.atol + self.config.tol * mean.abs();
				if std <= threshold {
					success = true;
					message =
						format!("Converged: std(pop_f)={:.3e} <= threshold={:.3e}", std, threshold);
					break;
				}
			}
		}

		if !success {
			message = format!("Maximum iterations reached: {}", self.config.maxiter);
		}
		if self.config.disp {
			log::info!("DE finished: {}", message);
		}

		let best = fits[best_idx];
		DEReport {
			x: pop.row(best_idx).to_owned(),
			fun: best.value,
			violation: best.violation,
			success,
			message,
			nit,
			nfev,
			population_energies: Array1::from_iter(fits.iter().map(|f| f.value)),
			population: pop,
		}
	}
}
