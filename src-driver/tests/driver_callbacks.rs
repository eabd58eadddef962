use optdriver::{
    Callbacks, Comparison, DriverCallbacks, Host, HostError, Model, ParameterSpec, Problem, Scalar,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn problem_of(model: &Model) -> Problem {
    Problem::build(
        "test",
        &model.parameters(),
        &model.objectives(),
        &model.eq_constraints(),
        &model.ineq_constraints(),
    )
    .unwrap()
}

fn xy() -> Model {
    Model::new()
        .parameter(ParameterSpec::float("x", 0.0, -50.0, 50.0))
        .parameter(ParameterSpec::float("y", 0.0, -50.0, 50.0))
        .objective("f_xy", |s| {
            let (x, y) = (s.scalar("x")?, s.scalar("y")?);
            Ok((x - 3.0).powi(2) + x * y + (y + 4.0).powi(2) - 3.0)
        })
}

#[test]
fn test_inequality_sign_does_not_depend_on_the_side() {
    init_logging();
    // x - y >= 15
    let mut greater = xy().constraint("c", |s| Ok(s.scalar("x")? - s.scalar("y")?), Comparison::GreaterEq, 15.0);
    // 15 - (x - y) <= 0
    let mut less = xy().constraint("c", |s| Ok(15.0 - (s.scalar("x")? - s.scalar("y")?)), Comparison::LessEq, 0.0);

    let p_greater = problem_of(&greater);
    let p_less = problem_of(&less);
    let mut cb_greater = DriverCallbacks::new(&mut greater, &p_greater, None);
    let mut cb_less = DriverCallbacks::new(&mut less, &p_less, None);

    for x in [[0.0, 0.0], [20.0, 1.0], [7.0, -8.0]] {
        let a = cb_greater.evaluate(&x);
        let b = cb_less.evaluate(&x);
        assert!(!a.fail && !b.fail);
        assert!((a.constraints[0] - (x[0] - x[1] - 15.0)).abs() < 1e-12);
        assert!((a.constraints[0] - b.constraints[0]).abs() < 1e-12);

        let ga = cb_greater.gradient(&x, &a.objectives, &a.constraints);
        let gb = cb_less.gradient(&x, &b.objectives, &b.constraints);
        assert!(!ga.fail && !gb.fail);
        assert_eq!(ga.constraints.dim(), (1, 2));
        assert!((ga.constraints[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((ga.constraints[[0, 1]] + 1.0).abs() < 1e-6);
        for j in 0..2 {
            assert!((ga.constraints[[0, j]] - gb.constraints[[0, j]]).abs() < 1e-6);
        }
    }
}

#[test]
fn test_satisfied_inequality_is_non_negative() {
    let mut model = xy().constraint("lim", |s| s.scalar("x"), Comparison::LessEq, 10.0);
    let problem = problem_of(&model);
    let mut cb = DriverCallbacks::new(&mut model, &problem, None);
    assert_eq!(cb.evaluate(&[4.0, 0.0]).constraints, vec![6.0]);
    assert_eq!(cb.evaluate(&[12.0, 0.0]).constraints, vec![-2.0]);
}

#[test]
fn test_equality_rows_come_first() {
    let mut model = xy()
        .constraint("ineq", |s| s.scalar("x"), Comparison::GreaterEq, 1.0)
        .constraint("eq", |s| s.scalar("y"), Comparison::Equal, 2.0);
    let problem = problem_of(&model);
    assert_eq!(problem.n_eq(), 1);
    assert_eq!(problem.constraints[0].name, "eq");
    let mut cb = DriverCallbacks::new(&mut model, &problem, None);
    let ev = cb.evaluate(&[3.0, 5.0]);
    assert_eq!(ev.constraints, vec![3.0, 2.0]);
    let g = cb.gradient(&[3.0, 5.0], &ev.objectives, &ev.constraints);
    assert!((g.constraints[[0, 1]] - 1.0).abs() < 1e-6);
    assert!((g.constraints[[1, 0]] - 1.0).abs() < 1e-6);
    // objective row: df/dx = 2(x-3) + y = 5, df/dy = x + 2(y+4) = 21
    assert!((g.objectives[[0, 0]] - 5.0).abs() < 1e-5);
    assert!((g.objectives[[0, 1]] - 21.0).abs() < 1e-5);
}

#[test]
fn test_model_error_sets_fail_flag() {
    init_logging();
    let mut model = Model::new()
        .parameter(ParameterSpec::float("x", 0.0, -5.0, 5.0))
        .objective("f", |s| {
            let x = s.scalar("x")?;
            if x > 1.0 {
                return Err(HostError::Model(format!("diverged at x={}", x)));
            }
            Ok(x * x)
        });
    let problem = problem_of(&model);
    let mut cb = DriverCallbacks::new(&mut model, &problem, None);

    assert!(!cb.evaluate(&[0.5]).fail);
    let ev = cb.evaluate(&[2.0]);
    assert!(ev.fail);
    let g = cb.gradient(&[2.0], &[], &[]);
    assert!(g.fail);
    // still usable afterwards
    let ev = cb.evaluate(&[-1.0]);
    assert!(!ev.fail);
    assert_eq!(ev.objectives, vec![1.0]);

    let counts = cb.finish().unwrap();
    assert_eq!(counts.evaluations, 3);
    assert_eq!(counts.gradients, 1);
    assert_eq!(counts.failures, 2);
}

#[test]
fn test_panic_in_model_sets_fail_flag() {
    init_logging();
    let mut model = Model::new()
        .parameter(ParameterSpec::float("x", 0.0, -5.0, 5.0))
        .objective("f", |s| {
            let x = s.scalar("x")?;
            if x < 0.0 {
                panic!("negative input");
            }
            Ok(x.sqrt())
        });
    let problem = problem_of(&model);
    let mut cb = DriverCallbacks::new(&mut model, &problem, None);
    assert!(cb.evaluate(&[-1.0]).fail);
    assert!(cb.gradient(&[-1.0], &[], &[]).fail);
    let ev = cb.evaluate(&[4.0]);
    assert!(!ev.fail);
    assert_eq!(ev.objectives, vec![2.0]);
}

#[test]
fn test_only_the_declared_prefix_is_used() {
    let mut model = xy();
    let problem = problem_of(&model);
    let mut cb = DriverCallbacks::new(&mut model, &problem, None);
    let long = cb.evaluate(&[3.0, -4.0, 123.0, 456.0]);
    assert!(!long.fail);
    assert_eq!(long.objectives, vec![-15.0]);

    assert!(cb.evaluate(&[3.0]).fail);
    assert!(cb.gradient(&[], &[], &[]).fail);
}

#[test]
fn test_gradient_reruns_model_at_new_point() {
    let mut model = xy();
    let problem = problem_of(&model);
    {
        let mut cb = DriverCallbacks::new(&mut model, &problem, None);
        cb.evaluate(&[0.0, 0.0]);
        // never evaluated at this point: the model must move there first
        let g = cb.gradient(&[3.0, -4.0], &[], &[]);
        assert!((g.objectives[[0, 0]] + 4.0).abs() < 1e-5);
        assert!((g.objectives[[0, 1]] - 3.0).abs() < 1e-5);
    }
    assert_eq!(model.executions(), 2);
    assert_eq!(model.state().scalar("x").unwrap(), 3.0);
}

#[test]
fn test_vector_and_discrete_parameters_round_trip() {
    let mut model = Model::new()
        .parameter(ParameterSpec::float_vec("v", &[1.0, 2.0, 3.0], 0.0, 10.0))
        .parameter(ParameterSpec::boolean("flag", false))
        .parameter(ParameterSpec::integer("n", 4, 0, 10))
        .parameter(ParameterSpec::enumerated("mode", "fast".into(), vec!["slow".into(), "fast".into()]))
        .objective("f", |s| {
            let sum: f64 = s.vector("v")?.iter().sum();
            let flag = if s.get("flag")?[0] == Scalar::Bool(true) { 1.0 } else { 0.0 };
            Ok(sum + flag + s.scalar("n")?)
        })
        .vector_constraint("upper", 3, |s| s.vector("v"), Comparison::LessEq, 5.0);
    let problem = problem_of(&model);

    let names: Vec<&str> = problem.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["v[0]", "v[1]", "v[2]", "flag", "n", "mode"]);
    // false is the second choice of a boolean
    assert_eq!(problem.start(), vec![1.0, 2.0, 3.0, 1.0, 4.0, 1.0]);
    assert_eq!(problem.n_constraints(), 3);

    let mut cb = DriverCallbacks::new(&mut model, &problem, None);
    let ev = cb.evaluate(&[1.0, 1.0, 1.0, 0.2, 2.6, 0.0]);
    assert!(!ev.fail);
    // 3 + true + round(2.6)
    assert_eq!(ev.objectives, vec![7.0]);
    assert_eq!(ev.constraints, vec![4.0, 4.0, 4.0]);
    let g = cb.gradient(&[1.0, 1.0, 1.0, 0.2, 2.6, 0.0], &[], &[]);
    assert_eq!(g.objectives.dim(), (1, 6));
    assert_eq!(g.constraints.dim(), (3, 6));
    assert!((g.constraints[[1, 1]] + 1.0).abs() < 1e-6);
    assert_eq!(g.objectives[[0, 3]], 0.0);
    drop(cb);

    assert_eq!(model.state().get("mode").unwrap(), &[Scalar::Text("slow".into())]);
    assert_eq!(model.state().get("n").unwrap(), &[Scalar::Int(3)]);
}
