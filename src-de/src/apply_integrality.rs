use ndarray::Array1;

/// Round masked variables to the nearest integer, keeping them inside bounds.
///
/// Rounding is half away from zero (`f64::round`); bounds are tightened to the
/// integers they contain so a rounded value never leaves the box.
pub fn apply_integrality(
	x: &mut Array1<f64>,
	mask: &[bool],
	lower: &Array1<f64>,
	upper: &Array1<f64>,
) {
	for (i, &is_int) in mask.iter().enumerate().take(x.len()) {
		if !is_int {
			continue;
		}
		let lo = lower[i].ceil();
		let hi = upper[i].floor();
		let v = x[i].round();
		x[i] = if lo <= hi { v.clamp(lo, hi) } else { v };
	}
}
