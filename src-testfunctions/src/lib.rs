//! Optimization test problems
//!
//! Each problem is an in-memory [`optdriver::Model`] host with named
//! parameters, objectives and constraints, ready to be handed to an
//! [`optdriver::OptimizationDriver`]. Problems are organized by category:
//!
//! - **Analytic**: paraboloid, multi-objective, equality constrained sphere
//! - **Constrained**: rosenbrock disk, keanes bump, mishra's bird, binh-korn
//! - **Mixed**: integer, boolean and enumerated parameters
//! - **Faulty**: models that fail or panic on part of the domain
//!
//! # Example
//!
//! ```rust
//! use optdriver::{DriverConfig, OptimizationDriver};
//! use optdriver_testfunctions::get_problem;
//!
//! let mut model = get_problem("paraboloid").unwrap();
//! let mut driver = OptimizationDriver::new(DriverConfig {
//!     optimizer: "optdriver:de".into(),
//!     print_results: false,
//!     ..Default::default()
//! });
//! driver.set_option("seed", 1i64);
//! let solution = driver.run(&mut model).unwrap();
//! assert!(solution.constraints[0] > -1e-6);
//! ```

use optdriver::Model;
use serde::Serialize;

pub mod functions;
pub mod problems;
pub use problems::*;

/// Metadata for a canned problem
#[derive(Debug, Clone, Serialize)]
pub struct ProblemMetadata {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    /// Known optimum of the summed objectives, when there is one
    pub optimum: Option<f64>,
    /// Algorithm the problem is usually run with
    pub suggested_algorithm: &'static str,
}

const fn meta(
    name: &'static str,
    category: &'static str,
    description: &'static str,
    optimum: Option<f64>,
    suggested_algorithm: &'static str,
) -> ProblemMetadata {
    ProblemMetadata {
        name,
        category,
        description,
        optimum,
        suggested_algorithm,
    }
}

static PROBLEMS: [ProblemMetadata; 14] = [
    meta("paraboloid", "analytic", "paraboloid with x - y >= 15", Some(-27.08333333333333), "nlopt:slsqp"),
    meta("paraboloid_flipped", "analytic", "paraboloid with 15 - (x - y) <= 0", Some(-27.08333333333333), "nlopt:slsqp"),
    meta("multifunction", "analytic", "two objectives summed, two linear constraints", None, "nlopt:slsqp"),
    meta("sphere_equality", "analytic", "sphere on the line x0 + x1 = 1", Some(0.5), "nlopt:slsqp"),
    meta("rosenbrock_disk", "constrained", "rosenbrock inside x^2 + y^2 <= 2", Some(0.0), "nlopt:cobyla"),
    meta("keanes_bump", "constrained", "keanes bump in 2 dimensions", Some(-0.36497975), "optdriver:de"),
    meta("mishras_bird", "constrained", "mishra's bird inside a disk", Some(-106.7645367), "optdriver:de"),
    meta("binh_korn", "constrained", "binh-korn weighted objective", Some(0.0), "nlopt:slsqp"),
    meta("ackley", "unconstrained", "ackley in 2 dimensions", Some(0.0), "mh:pso"),
    meta("rastrigin", "unconstrained", "rastrigin in 2 dimensions", Some(0.0), "optdriver:de"),
    meta("integer_product", "mixed", "maximize x1 x2 x3 over integers", Some(-3456.0), "optdriver:de"),
    meta("mixed_design", "mixed", "continuous, integer, boolean and enumerated choices", Some(3.375), "optdriver:de"),
    meta("failing", "faulty", "model errors for |x| > 2", Some(0.0), "optdriver:de"),
    meta("panicking", "faulty", "model panics for x < 0", Some(0.0), "optdriver:de"),
];

/// Metadata of every canned problem
pub fn get_problem_metadata() -> &'static [ProblemMetadata] {
    &PROBLEMS
}

pub fn problem_names() -> Vec<&'static str> {
    PROBLEMS.iter().map(|p| p.name).collect()
}

/// Build a fresh model for a named problem
pub fn get_problem(name: &str) -> Option<Model> {
    let model = match name {
        "paraboloid" => paraboloid_problem(),
        "paraboloid_flipped" => paraboloid_flipped_problem(),
        "multifunction" => multifunction_problem(),
        "sphere_equality" => sphere_equality_problem(),
        "rosenbrock_disk" => rosenbrock_disk_problem(),
        "keanes_bump" => keanes_bump_problem(2),
        "mishras_bird" => mishras_bird_problem(),
        "binh_korn" => binh_korn_problem(),
        "ackley" => ackley_problem(2),
        "rastrigin" => rastrigin_problem(2),
        "integer_product" => integer_product_problem(),
        "mixed_design" => mixed_design_problem(),
        "failing" => failing_problem(),
        "panicking" => panicking_problem(),
        _ => return None,
    };
    Some(model)
}
