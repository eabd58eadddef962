use ndarray::{Array1, Array2};
use rand::Rng;

use crate::distinct_indices::distinct_indices;

pub(crate) fn mutant_best1<R: Rng + ?Sized>(
	i: usize,
	pop: &Array2<f64>,
	best_idx: usize,
	f: f64,
	rng: &mut R,
) -> Array1<f64> {
	let idxs = distinct_indices(i, 2, pop.nrows(), rng);
	pop.row(best_idx).to_owned() + (pop.row(idxs[0]).to_owned() - pop.row(idxs[1]).to_owned()) * f
}
