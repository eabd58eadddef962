use rand::Rng;
use rand::seq::index::sample;

/// Draw `k` distinct population indices in `0..n`, all different from `exclude`.
pub(crate) fn distinct_indices<R: Rng + ?Sized>(
	exclude: usize,
	k: usize,
	n: usize,
	rng: &mut R,
) -> Vec<usize> {
	debug_assert!(n > k, "population too small for {} partners", k);
	sample(rng, n - 1, k)
		.into_iter()
		.map(|idx| if idx >= exclude { idx + 1 } else { idx })
		.collect()
}
