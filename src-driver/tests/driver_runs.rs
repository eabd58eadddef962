use optdriver::{
    Comparison, DriverConfig, DriverError, HostError, Model, OptimizationDriver, OptionValue, ParameterSpec,
    Scalar, State,
};
use tempfile::tempdir;

/// maximize x1 x2 x3 subject to 0 <= x1 + 2 x2 + 2 x3 <= 72
fn integer_product() -> Model {
    let sum = |s: &State| -> Result<f64, HostError> { Ok(s.scalar("x1")? + 2.0 * s.scalar("x2")? + 2.0 * s.scalar("x3")?) };
    Model::new()
        .parameter(ParameterSpec::integer("x1", 1, 0, 42))
        .parameter(ParameterSpec::integer("x2", 1, 0, 42))
        .parameter(ParameterSpec::integer("x3", 1, 0, 42))
        .objective("f", |s| Ok(-s.scalar("x1")? * s.scalar("x2")? * s.scalar("x3")?))
        .constraint("upper", sum, Comparison::LessEq, 72.0)
        .constraint("lower", sum, Comparison::GreaterEq, 0.0)
}

fn de_config() -> DriverConfig {
    DriverConfig {
        optimizer: "optdriver:de".to_string(),
        print_results: false,
        ..Default::default()
    }
    .with_option("seed", 1i64)
    .with_option("maxiter", 600i64)
    .with_option("popsize", 30i64)
    .with_option("tol", 1e-12)
}

#[test]
fn test_integer_problem_with_native_de() {
    let mut model = integer_product();
    let mut driver = OptimizationDriver::new(de_config());
    let solution = driver.run(&mut model).unwrap().clone();

    let values: Vec<i64> = solution
        .values
        .iter()
        .map(|v| match v[0] {
            Scalar::Int(i) => i,
            ref other => panic!("expected an integer, got {}", other),
        })
        .collect();
    assert_eq!(values, vec![24, 12, 12]);
    assert_eq!(solution.objectives[0], -3456.0);
    assert!(solution.constraints.iter().all(|&c| c >= 0.0));
    assert_eq!(model.state().get("x1").unwrap(), &[Scalar::Int(values[0])]);
}

#[test]
fn test_unsupported_optimizer_never_runs_the_model() {
    let mut model = integer_product();
    let mut driver = OptimizationDriver::new(DriverConfig {
        optimizer: "snopt:snopt".into(),
        ..Default::default()
    });
    match driver.run(&mut model) {
        Err(DriverError::UnsupportedOptimizer { name, available }) => {
            assert_eq!(name, "snopt:snopt");
            assert!(available.contains(&"optdriver:de".to_string()));
        }
        other => panic!("unexpected {:?}", other.map(|s| s.message.clone())),
    }
    assert_eq!(model.executions(), 0);
}

#[test]
fn test_bad_option_value_is_a_setup_error() {
    let mut model = integer_product();
    let mut driver = OptimizationDriver::new(de_config());
    driver.set_option("recombination", "lots");
    let err = driver.run(&mut model).unwrap_err();
    assert_eq!(err.category(), "InvalidOption");
    assert_eq!(model.reported_errors().len(), 1);
}

#[test]
fn test_hot_start_replays_without_model_runs() {
    let dir = tempdir().unwrap();
    let first_path = dir.path().join("first.csv");
    let second_path = dir.path().join("second.csv");

    let mut config = de_config().with_option("maxiter", 40i64);
    config.initial_run = false;
    config.store_history = Some(first_path.clone());
    let mut first_model = integer_product();
    let first = OptimizationDriver::new(config.clone())
        .run(&mut first_model)
        .map(|s| s.clone())
        .unwrap();
    // every evaluation plus the final run
    assert_eq!(first_model.executions(), first.evaluations + 1);

    config.store_history = Some(second_path.clone());
    config.hot_start = Some(first_path.clone());
    let mut second_model = integer_product();
    let second = OptimizationDriver::new(config)
        .run(&mut second_model)
        .map(|s| s.clone())
        .unwrap();
    // only the final run touches the model
    assert_eq!(second_model.executions(), 1);
    assert_eq!(second.x, first.x);
    assert_eq!(second.evaluations, first.evaluations);

    // replayed records are stored again
    let first_text = std::fs::read_to_string(&first_path).unwrap();
    let second_text = std::fs::read_to_string(&second_path).unwrap();
    assert_eq!(first_text, second_text);
}

#[test]
fn test_hot_start_and_store_may_share_a_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.csv");

    let mut config = de_config().with_option("maxiter", 20i64);
    config.initial_run = false;
    config.store_history = Some(path.clone());
    config.hot_start = Some(path.clone());

    let mut model = integer_product();
    let first = OptimizationDriver::new(config.clone())
        .run(&mut model)
        .map(|s| s.clone())
        .unwrap();
    let mut model = integer_product();
    let second = OptimizationDriver::new(config)
        .run(&mut model)
        .map(|s| s.clone())
        .unwrap();
    assert_eq!(model.executions(), 1);
    assert_eq!(second.x, first.x);
}

#[test]
fn test_config_file_drives_a_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("driver.yaml");
    std::fs::write(
        &path,
        "optimizer: optdriver:de\nprint_results: false\noptions:\n  seed: 3\n  maxiter: 100\n",
    )
    .unwrap();
    let config = DriverConfig::from_file(&path).unwrap();
    assert_eq!(config.options["seed"], OptionValue::Int(3));

    let mut model = Model::new()
        .parameter(ParameterSpec::float("x", 4.0, -10.0, 10.0))
        .objective("f", |s| Ok((s.scalar("x")? + 2.0).powi(2)));
    let mut driver = OptimizationDriver::new(config);
    let solution = driver.run(&mut model).unwrap();
    assert!((solution.x[0] + 2.0).abs() < 1e-2);
    assert!(driver.solution().is_some());
}
