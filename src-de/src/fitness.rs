//! Objective value paired with a constraint violation measure.
//!
//! Selection follows the feasibility rules of Deb (2000):
//! a feasible point beats an infeasible one, two feasible points compare by
//! objective, two infeasible points compare by total violation.

/// Result of evaluating one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fitness {
	/// Objective value (to be minimized)
	pub value: f64,
	/// Total constraint violation, 0 when every constraint holds
	pub violation: f64,
}

impl Fitness {
	/// Unconstrained fitness
	pub fn new(value: f64) -> Self {
		Self { value, violation: 0.0 }
	}

	pub fn constrained(value: f64, violation: f64) -> Self {
		let violation = if violation.is_nan() { f64::INFINITY } else { violation.max(0.0) };
		Self { value, violation }
	}

	/// Marker for a point that could not be evaluated
	pub fn failed() -> Self {
		Self { value: f64::INFINITY, violation: f64::INFINITY }
	}

	pub fn is_feasible(&self) -> bool {
		self.violation <= 0.0
	}

	/// Strict ordering under the feasibility rules
	pub fn is_better_than(&self, other: &Fitness) -> bool {
		match (self.is_feasible(), other.is_feasible()) {
			(true, false) => true,
			(false, true) => false,
			(true, true) => self.value < other.value,
			(false, false) => self.violation < other.violation,
		}
	}
}

impl From<f64> for Fitness {
	fn from(value: f64) -> Self {
		Fitness::new(value)
	}
}

pub(crate) fn best_index(fits: &[Fitness]) -> usize {
	let mut best_i = 0usize;
	for (i, fit) in fits.iter().enumerate() {
		if fit.is_better_than(&fits[best_i]) {
			best_i = i;
		}
	}
	best_i
}

/// Standard deviation of the population objective values.
/// `None` while any member is infeasible or not finite.
pub(crate) fn population_spread(fits: &[Fitness]) -> Option<f64> {
	if fits.is_empty() || fits.iter().any(|f| !f.is_feasible() || !f.value.is_finite()) {
		return None;
	}
	let n = fits.len() as f64;
	let mean = fits.iter().map(|f| f.value).sum::<f64>() / n;
	let var = fits.iter().map(|f| (f.value - mean).powi(2)).sum::<f64>() / n;
	Some(var.sqrt())
}
