//! Plain objective and constraint functions used by the canned problems
//!
//! Constraint helpers return the left-hand side only; the comparison and the
//! right-hand side live in the problem definition.

use ndarray::Array1;
use std::f64::consts::{E, PI};

/// Paraboloid f(x,y) = (x-3)^2 + xy + (y+4)^2 - 3
/// Unconstrained minimum: f = -27.333 at (6.667, -7.333)
pub fn paraboloid(x: f64, y: f64) -> f64 {
    (x - 3.0).powi(2) + x * y + (y + 4.0).powi(2) - 3.0
}

/// Sphere function
/// Global minimum: f(x) = 0 at x = (0, 0, ..., 0)
pub fn sphere(x: &Array1<f64>) -> f64 {
    x.iter().map(|&xi| xi * xi).sum()
}

/// Rosenbrock function - N-dimensional banana function
/// Global minimum: f(x) = 0 at x = (1, 1, ..., 1)
pub fn rosenbrock(x: &Array1<f64>) -> f64 {
    x.windows(2)
        .into_iter()
        .map(|w| 100.0 * (w[1] - w[0].powi(2)).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

/// Ackley function - N-dimensional multimodal
/// Global minimum: f(x) = 0 at x = (0, 0, ..., 0)
/// Bounds: x_i in [-32.768, 32.768]
pub fn ackley(x: &Array1<f64>) -> f64 {
    let n = x.len() as f64;
    let sum_sq: f64 = x.iter().map(|&xi| xi.powi(2)).sum();
    let sum_cos: f64 = x.iter().map(|&xi| (2.0 * PI * xi).cos()).sum();

    -20.0 * (-0.2 * (sum_sq / n).sqrt()).exp() - (sum_cos / n).exp() + 20.0 + E
}

/// Rastrigin function - highly multimodal
/// Global minimum: f(x) = 0 at x = (0, 0, ..., 0)
/// Bounds: x_i in [-5.12, 5.12]
pub fn rastrigin(x: &Array1<f64>) -> f64 {
    let n = x.len() as f64;
    let sum: f64 = x
        .iter()
        .map(|&xi| xi.powi(2) - 10.0 * (2.0 * PI * xi).cos())
        .sum();
    10.0 * n + sum
}

/// Keane's bump function objective
/// Subject to x1*x2*...*xn >= 0.75 and sum(x_i) <= 7.5*n, x_i in [0, 10]
pub fn keanes_bump(x: &Array1<f64>) -> f64 {
    let sum_cos4: f64 = x.iter().map(|&xi| xi.cos().powi(4)).sum();
    let prod_cos2: f64 = x.iter().map(|&xi| xi.cos().powi(2)).product();
    let sum_i_xi2: f64 = x
        .iter()
        .enumerate()
        .map(|(i, &xi)| (i + 1) as f64 * xi.powi(2))
        .sum();

    -(sum_cos4 - 2.0 * prod_cos2).abs() / sum_i_xi2.sqrt()
}

pub fn product(x: &Array1<f64>) -> f64 {
    x.iter().product()
}

/// Mishra's Bird objective function, usually constrained to (x+5)^2 + (y+5)^2 < 25
/// Global minimum: f = -106.7645 at (-3.1302, -1.5822)
pub fn mishras_bird(x: f64, y: f64) -> f64 {
    y.sin() * (1.0 - x.cos()).powi(2).exp() + x.cos() * (1.0 - y.sin()).powi(2).exp() + (x - y).powi(2)
}

/// Binh-Korn weighted objective, constrained to x^2 + y^2 <= 25 and
/// (x-8)^2 + (y+3)^2 >= 7.7
pub fn binh_korn_weighted(x: f64, y: f64) -> f64 {
    4.0 * x.powi(2) + 4.0 * y.powi(2)
}
