#![cfg(feature = "nlopt")]

use optdriver::{Comparison, DriverConfig, Model, OptimizationDriver, ParameterSpec};

fn paraboloid() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", 0.0, -50.0, 50.0))
        .parameter(ParameterSpec::float("y", 0.0, -50.0, 50.0))
        .objective("f_xy", |s| {
            let (x, y) = (s.scalar("x")?, s.scalar("y")?);
            Ok((x - 3.0).powi(2) + x * y + (y + 4.0).powi(2) - 3.0)
        })
        .constraint("c", |s| Ok(s.scalar("x")? - s.scalar("y")?), Comparison::GreaterEq, 15.0)
}

fn driver(optimizer: &str, use_solver_fd: bool) -> OptimizationDriver {
    OptimizationDriver::new(DriverConfig {
        optimizer: optimizer.to_string(),
        use_solver_fd,
        print_results: false,
        ..Default::default()
    })
}

fn assert_rel(value: f64, expected: f64, rel: f64) {
    assert!(
        ((value - expected) / expected).abs() < rel,
        "value={} expected={}",
        value,
        expected
    );
}

#[test]
fn test_paraboloid_slsqp_with_host_gradients() {
    let mut model = paraboloid();
    let mut driver = driver("nlopt:slsqp", false);
    let solution = driver.run(&mut model).unwrap().clone();
    assert!(solution.success, "{}", solution.message);
    assert_rel(solution.x[0], 7.175775, 0.01);
    assert_rel(solution.x[1], -7.824225, 0.01);
    assert!(solution.constraints[0] > -1e-6);
    assert!(solution.gradients > 0);
    // the host holds the reported optimum
    assert_eq!(model.state().scalar("x").unwrap(), solution.x[0]);
}

#[test]
fn test_paraboloid_slsqp_with_solver_differences() {
    let mut model = paraboloid();
    let mut driver = driver("slsqp", true);
    let solution = driver.run(&mut model).unwrap().clone();
    assert_rel(solution.x[0], 7.175775, 0.01);
    assert_rel(solution.x[1], -7.824225, 0.01);
    assert_eq!(solution.gradients, 0);
}

#[test]
fn test_paraboloid_cobyla() {
    let mut model = paraboloid();
    let mut driver = driver("nlopt:cobyla", false);
    driver.set_option("maxeval", 5000i64);
    driver.set_option("xtol_rel", 1e-8);
    let solution = driver.run(&mut model).unwrap().clone();
    assert_rel(solution.x[0], 7.175775, 0.01);
    assert_rel(solution.x[1], -7.824225, 0.01);
    assert_eq!(solution.gradients, 0);
}

#[test]
fn test_two_objectives_are_summed() {
    let mut model = Model::new()
        .parameter(ParameterSpec::float("x1", 1.0, 0.1, 1.0))
        .parameter(ParameterSpec::float("x2", 1.0, 0.0, 5.0))
        .objective("f1", |s| s.scalar("x1"))
        .objective("f2", |s| Ok((1.0 + s.scalar("x2")?) / s.scalar("x1")?))
        .constraint("c1", |s| Ok(s.scalar("x2")? + 9.0 * s.scalar("x1")?), Comparison::GreaterEq, 6.0)
        .constraint("c2", |s| Ok(-s.scalar("x2")? + 9.0 * s.scalar("x1")?), Comparison::GreaterEq, 1.0);
    let mut driver = driver("nlopt:slsqp", false);
    let solution = driver.run(&mut model).unwrap().clone();
    assert_eq!(solution.objectives.len(), 2);
    for c in &solution.constraints {
        assert!(*c > -1e-6, "{:?}", solution.constraints);
    }
    // the feasible start point has f1 + f2 = 3
    let total: f64 = solution.objectives.iter().sum();
    assert!(total.is_finite());
    assert!(total < 3.0);
}

#[test]
fn test_unconstrained_algorithm_folds_constraints() {
    let mut model = paraboloid();
    let mut driver = driver("nlopt:bobyqa", false);
    driver.set_option("penalty", 1e6);
    driver.set_option("maxeval", 20_000i64);
    let solution = driver.run(&mut model).unwrap().clone();
    assert!((solution.x[0] - solution.x[1] - 15.0).abs() < 1e-2);
    assert_rel(solution.x[0], 43.0 / 6.0, 0.01);
}
