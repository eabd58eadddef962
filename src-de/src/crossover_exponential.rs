use ndarray::Array1;
use rand::Rng;

/// Exponential crossover: copy a contiguous (wrapping) run of mutant
/// coordinates starting at a random position.
pub(crate) fn exponential_crossover<R: Rng + ?Sized>(
	target: &Array1<f64>,
	mutant: &Array1<f64>,
	cr: f64,
	rng: &mut R,
) -> Array1<f64> {
	let n = target.len();
	let mut trial = target.clone();
	let mut j = rng.random_range(0..n);
	let mut copied = 0;
	loop {
		trial[j] = mutant[j];
		copied += 1;
		j = (j + 1) % n;
		if copied >= n || rng.random::<f64>() >= cr {
			break;
		}
	}
	trial
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn test_full_copy_with_cr_one() {
		let mut rng = StdRng::seed_from_u64(3);
		let target = Array1::from(vec![0.0; 4]);
		let mutant = Array1::from(vec![1.0; 4]);
		let trial = exponential_crossover(&target, &mutant, 1.0, &mut rng);
		assert_eq!(trial.to_vec(), vec![1.0; 4]);
	}
}
