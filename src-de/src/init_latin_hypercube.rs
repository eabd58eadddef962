use ndarray::{Array1, Array2};
use rand::Rng;
use rand::seq::SliceRandom;

/// Latin Hypercube initialization: each free dimension is split into `npop`
/// strata, one sample per stratum, strata shuffled independently per dimension.
pub(crate) fn init_latin_hypercube<R: Rng + ?Sized>(
	n: usize,
	npop: usize,
	lower: &Array1<f64>,
	upper: &Array1<f64>,
	is_free: &[bool],
	rng: &mut R,
) -> Array2<f64> {
	let mut pop = Array2::<f64>::zeros((npop, n));
	let mut strata: Vec<usize> = (0..npop).collect();
	for j in 0..n {
		if !is_free[j] {
			pop.column_mut(j).fill(lower[j]);
			continue;
		}
		strata.shuffle(rng);
		let span = upper[j] - lower[j];
		for (i, &s) in strata.iter().enumerate() {
			let u = (s as f64 + rng.random::<f64>()) / npop as f64;
			pop[[i, j]] = lower[j] + u * span;
		}
	}
	pop
}
