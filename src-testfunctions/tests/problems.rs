use optdriver::{DriverConfig, Host, OptimizationDriver, Scalar, Solution};
use optdriver_testfunctions::*;

fn solve(problem: &str, optimizer: &str, options: &[(&str, i64)]) -> (Solution, usize) {
    let mut model = get_problem(problem).unwrap();
    let mut driver = OptimizationDriver::new(DriverConfig {
        optimizer: optimizer.to_string(),
        print_results: false,
        ..Default::default()
    });
    for (name, value) in options {
        driver.set_option(name, *value);
    }
    let solution = driver.run(&mut model).unwrap().clone();
    (solution, model.executions())
}

#[test]
fn test_every_listed_problem_builds() {
    for name in problem_names() {
        let model = get_problem(name).unwrap_or_else(|| panic!("missing {}", name));
        assert!(!model.objectives().is_empty(), "{}", name);
        assert!(!model.parameters().is_empty(), "{}", name);
    }
    assert!(get_problem("nope").is_none());
}

#[test]
fn test_paraboloid_native_de() {
    let (solution, _) = solve("paraboloid", "optdriver:de", &[("seed", 3), ("maxiter", 1500), ("popsize", 25)]);
    assert!(solution.constraints[0] > -1e-6);
    assert!((solution.x[0] - 43.0 / 6.0).abs() < 0.05, "{:?}", solution.x);
    assert!((solution.x[1] + 47.0 / 6.0).abs() < 0.05, "{:?}", solution.x);
}

#[test]
fn test_mixed_design_native_de() {
    let (solution, _) = solve("mixed_design", "optdriver:de", &[("seed", 2), ("maxiter", 400), ("popsize", 30)]);
    assert!(solution.constraints[0] >= 0.0);
    assert_eq!(solution.values[2], vec![Scalar::Bool(true)]);
    assert_eq!(solution.values[3], vec![Scalar::Text("aluminium".into())]);
    assert!((solution.objectives[0] - 3.375).abs() < 0.05, "{}", solution.objectives[0]);
}

#[test]
fn test_failing_model_is_survivable() {
    let (solution, _) = solve("failing", "optdriver:de", &[("seed", 1), ("maxiter", 100)]);
    // the failure region covers most of the box
    assert!(solution.failures > 0);
    assert!((solution.x[0] - 1.5).abs() < 1e-2);
}

#[test]
fn test_panicking_model_is_survivable() {
    let (solution, _) = solve("panicking", "optdriver:de", &[("seed", 1), ("maxiter", 100)]);
    assert!(solution.failures > 0);
    assert!((solution.x[0] - 1.0).abs() < 1e-2);
}

#[cfg(feature = "nlopt")]
mod nlopt {
    use super::*;

    #[test]
    fn test_flipped_inequality_gives_the_same_optimum() {
        let (a, _) = solve("paraboloid", "nlopt:slsqp", &[]);
        let (b, _) = solve("paraboloid_flipped", "nlopt:slsqp", &[]);
        assert!((a.x[0] - b.x[0]).abs() < 1e-6);
        assert!((a.x[1] - b.x[1]).abs() < 1e-6);
        assert!((a.constraints[0] - b.constraints[0]).abs() < 1e-6);
    }

    #[test]
    fn test_equality_constraint_slsqp() {
        let (solution, _) = solve("sphere_equality", "nlopt:slsqp", &[]);
        assert!((solution.x[0] - 0.5).abs() < 1e-4);
        assert!((solution.x[1] - 0.5).abs() < 1e-4);
        assert!(solution.constraints[0].abs() < 1e-6);
    }

    #[test]
    fn test_rosenbrock_disk_cobyla() {
        let (solution, _) = solve("rosenbrock_disk", "nlopt:cobyla", &[("maxeval", 10_000)]);
        assert!((solution.x[0] - 1.0).abs() < 1e-2, "{:?}", solution.x);
        assert!((solution.x[1] - 1.0).abs() < 1e-2, "{:?}", solution.x);
    }
}

#[cfg(feature = "mh")]
mod metaheuristics {
    use super::*;

    #[test]
    fn test_ackley_pso() {
        let (solution, executions) = solve("ackley", "mh:pso", &[("population", 40), ("generations", 150)]);
        assert!(solution.objectives[0] < 1e-2, "{:?}", solution.objectives);
        assert!(executions > 40);
    }

    #[test]
    fn test_binh_korn_de_with_penalty() {
        let (solution, _) = solve("binh_korn", "mh:de", &[("population", 30), ("generations", 200)]);
        assert!(solution.objectives[0] < 1e-2, "{:?}", solution.objectives);
        assert!(solution.constraints.iter().all(|&c| c >= 0.0));
    }
}
