//! Canned problems expressed as in-memory model hosts

use ndarray::Array1;
use optdriver::{Comparison, HostError, Model, ParameterSpec, Scalar, State};

use crate::functions::*;

fn xy(state: &State) -> Result<(f64, f64), HostError> {
    Ok((state.scalar("x")?, state.scalar("y")?))
}

fn array(state: &State, name: &str) -> Result<Array1<f64>, HostError> {
    Ok(Array1::from(state.vector(name)?))
}

/// Paraboloid with `x - y >= 15`, starting at the origin
/// Constrained minimum at (43/6, -47/6)
pub fn paraboloid_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", 0.0, -50.0, 50.0))
        .parameter(ParameterSpec::float("y", 0.0, -50.0, 50.0))
        .objective("f_xy", |s| {
            let (x, y) = xy(s)?;
            Ok(paraboloid(x, y))
        })
        .constraint(
            "c",
            |s| {
                let (x, y) = xy(s)?;
                Ok(x - y)
            },
            Comparison::GreaterEq,
            15.0,
        )
}

/// Same feasible set as [`paraboloid_problem`], written as `15 - (x - y) <= 0`
pub fn paraboloid_flipped_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", 0.0, -50.0, 50.0))
        .parameter(ParameterSpec::float("y", 0.0, -50.0, 50.0))
        .objective("f_xy", |s| {
            let (x, y) = xy(s)?;
            Ok(paraboloid(x, y))
        })
        .constraint(
            "c",
            |s| {
                let (x, y) = xy(s)?;
                Ok(15.0 - (x - y))
            },
            Comparison::LessEq,
            0.0,
        )
}

/// Maximize x1 x2 x3 over integers with `0 <= x1 + 2 x2 + 2 x3 <= 72`
/// Optimum: (24, 12, 12) with product 3456
pub fn integer_product_problem() -> Model {
    let sum = |s: &State| -> Result<f64, HostError> {
        Ok(s.scalar("x1")? + 2.0 * s.scalar("x2")? + 2.0 * s.scalar("x3")?)
    };
    Model::new()
        .parameter(ParameterSpec::integer("x1", 1, 0, 42))
        .parameter(ParameterSpec::integer("x2", 1, 0, 42))
        .parameter(ParameterSpec::integer("x3", 1, 0, 42))
        .objective("neg_volume", |s| {
            Ok(-s.scalar("x1")? * s.scalar("x2")? * s.scalar("x3")?)
        })
        .constraint("upper", sum, Comparison::LessEq, 72.0)
        .constraint("lower", sum, Comparison::GreaterEq, 0.0)
}

/// Two objectives `x1` and `(1 + x2) / x1` with two linear constraints
pub fn multifunction_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x1", 1.0, 0.1, 1.0))
        .parameter(ParameterSpec::float("x2", 1.0, 0.0, 5.0))
        .objective("f1", |s| s.scalar("x1"))
        .objective("f2", |s| Ok((1.0 + s.scalar("x2")?) / s.scalar("x1")?))
        .constraint(
            "g1",
            |s| Ok(s.scalar("x2")? + 9.0 * s.scalar("x1")?),
            Comparison::GreaterEq,
            6.0,
        )
        .constraint(
            "g2",
            |s| Ok(-s.scalar("x2")? + 9.0 * s.scalar("x1")?),
            Comparison::GreaterEq,
            1.0,
        )
}

/// Rosenbrock restricted to the disk `x^2 + y^2 <= 2`
pub fn rosenbrock_disk_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float_vec("x", &[-1.0, 1.0], -1.5, 1.5))
        .objective("f", |s| Ok(rosenbrock(&array(s, "x")?)))
        .constraint("disk", |s| Ok(sphere(&array(s, "x")?)), Comparison::LessEq, 2.0)
}

/// Keane's bump in `n` dimensions, one vector parameter
pub fn keanes_bump_problem(n: usize) -> Model {
    Model::new()
        .parameter(ParameterSpec::float_vec("x", &vec![1.0; n], 0.0, 10.0))
        .objective("f", |s| Ok(keanes_bump(&array(s, "x")?)))
        .constraint("product", |s| Ok(product(&array(s, "x")?)), Comparison::GreaterEq, 0.75)
        .constraint(
            "sum",
            move |s| Ok(array(s, "x")?.sum() - 7.5 * n as f64),
            Comparison::LessEq,
            0.0,
        )
}

/// Mishra's bird inside the disk centered at (-5, -5)
pub fn mishras_bird_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", -4.0, -10.0, 0.0))
        .parameter(ParameterSpec::float("y", -4.0, -6.5, 0.0))
        .objective("f", |s| {
            let (x, y) = xy(s)?;
            Ok(mishras_bird(x, y))
        })
        .constraint(
            "disk",
            |s| {
                let (x, y) = xy(s)?;
                Ok((x + 5.0).powi(2) + (y + 5.0).powi(2))
            },
            Comparison::LessEq,
            25.0,
        )
}

/// Binh-Korn with both constraints; the weighted optimum is the origin
pub fn binh_korn_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", 1.0, 0.0, 5.0))
        .parameter(ParameterSpec::float("y", 1.0, 0.0, 3.0))
        .objective("f", |s| {
            let (x, y) = xy(s)?;
            Ok(binh_korn_weighted(x, y))
        })
        .constraint(
            "inner",
            |s| {
                let (x, y) = xy(s)?;
                Ok(x.powi(2) + y.powi(2))
            },
            Comparison::LessEq,
            25.0,
        )
        .constraint(
            "outer",
            |s| {
                let (x, y) = xy(s)?;
                Ok((x - 8.0).powi(2) + (y + 3.0).powi(2))
            },
            Comparison::GreaterEq,
            7.7,
        )
}

/// Sphere on a line: minimize |x|^2 subject to x0 + x1 = 1
pub fn sphere_equality_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float_vec("x", &[0.0, 0.0], -5.0, 5.0))
        .objective("f", |s| Ok(sphere(&array(s, "x")?)))
        .constraint("line", |s| Ok(array(s, "x")?.sum()), Comparison::Equal, 1.0)
}

/// Unconstrained multimodal landscapes for the global algorithms
pub fn ackley_problem(n: usize) -> Model {
    Model::new()
        .parameter(ParameterSpec::float_vec("x", &vec![2.5; n], -32.768, 32.768))
        .objective("f", |s| Ok(ackley(&array(s, "x")?)))
}

pub fn rastrigin_problem(n: usize) -> Model {
    Model::new()
        .parameter(ParameterSpec::float_vec("x", &vec![2.5; n], -5.12, 5.12))
        .objective("f", |s| Ok(rastrigin(&array(s, "x")?)))
}

/// Continuous, integer, boolean and enumerated parameters together
///
/// `material` picks a density, `hollow` halves the mass, `count` multiplies
/// it; the width is continuous. The lightest design that carries the load is
/// hollow aluminium with `count * width = 2.5`, mass 3.375.
pub fn mixed_design_problem() -> Model {
    let density = |s: &State| -> Result<f64, HostError> {
        match s.get("material")?.first() {
            Some(Scalar::Text(m)) if m == "steel" => Ok(7.8),
            Some(Scalar::Text(m)) if m == "aluminium" => Ok(2.7),
            Some(Scalar::Text(m)) if m == "titanium" => Ok(4.5),
            other => Err(HostError::Model(format!("unknown material {:?}", other))),
        }
    };
    let strength = |s: &State| -> Result<f64, HostError> {
        let per_piece = match s.get("material")?.first() {
            Some(Scalar::Text(m)) if m == "steel" => 4.0,
            Some(Scalar::Text(m)) if m == "aluminium" => 2.0,
            _ => 3.0,
        };
        let hollow = if s.get("hollow")?.first() == Some(&Scalar::Bool(true)) { 0.8 } else { 1.0 };
        Ok(per_piece * hollow * s.scalar("count")? * s.scalar("width")?)
    };
    Model::new()
        .parameter(ParameterSpec::float("width", 1.0, 0.5, 2.0))
        .parameter(ParameterSpec::integer("count", 2, 1, 8))
        .parameter(ParameterSpec::boolean("hollow", false))
        .parameter(ParameterSpec::enumerated(
            "material",
            "steel".into(),
            vec!["steel".into(), "aluminium".into(), "titanium".into()],
        ))
        .objective("mass", move |s| {
            let hollow = if s.get("hollow")?.first() == Some(&Scalar::Bool(true)) { 0.5 } else { 1.0 };
            Ok(density(s)? * hollow * s.scalar("count")? * s.scalar("width")?)
        })
        .constraint("load", strength, Comparison::GreaterEq, 4.0)
}

/// Objective that fails outside `|x| <= 2`, to exercise failure handling
pub fn failing_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", 1.0, -5.0, 5.0))
        .objective("f", |s| {
            let x = s.scalar("x")?;
            if x.abs() > 2.0 {
                return Err(HostError::Model(format!("solver diverged at x={}", x)));
            }
            Ok((x - 1.5).powi(2))
        })
}

/// Objective that panics for negative input
pub fn panicking_problem() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", 1.0, -5.0, 5.0))
        .objective("f", |s| {
            let x = s.scalar("x")?;
            assert!(x >= 0.0, "negative input {}", x);
            Ok((x.sqrt() - 1.0).powi(2))
        })
}
