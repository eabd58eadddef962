use ndarray::Array1;
use optdriver_de::{
	CallbackAction, DEConfigBuilder, DEIntermediate, Fitness, Init, Mutation, Strategy, differential_evolution,
};

fn sphere(x: &Array1<f64>) -> Fitness {
	Fitness::new(x.iter().map(|v| v * v).sum())
}

fn rosenbrock(x: &Array1<f64>) -> Fitness {
	let mut s = 0.0;
	for i in 0..x.len() - 1 {
		s += 100.0 * (x[i + 1] - x[i] * x[i]).powi(2) + (1.0 - x[i]).powi(2);
	}
	Fitness::new(s)
}

#[test]
fn test_de_sphere_2d() {
	let b = vec![(-5.0, 5.0), (-5.0, 5.0)];
	let c = DEConfigBuilder::new()
		.seed(30)
		.maxiter(500)
		.popsize(30)
		.strategy(Strategy::Rand1Bin)
		.recombination(0.8)
		.tol(1e-12)
		.build();
	let report = differential_evolution(&mut sphere, &b, c);
	assert!(report.fun < 1e-6, "fun={}", report.fun);
	assert!(report.nfev > 0);
}

#[test]
fn test_de_sphere_5d_exponential() {
	let b = vec![(-5.0, 5.0); 5];
	let c = DEConfigBuilder::new()
		.seed(31)
		.maxiter(1500)
		.popsize(20)
		.strategy(Strategy::Best1Exp)
		.recombination(0.9)
		.tol(1e-12)
		.build();
	let report = differential_evolution(&mut sphere, &b, c);
	assert!(report.fun < 1e-4, "fun={}", report.fun);
}

#[test]
fn test_de_rosenbrock_current_to_best() {
	let b = vec![(-2.0, 2.0), (-2.0, 2.0)];
	let c = DEConfigBuilder::new()
		.seed(42)
		.maxiter(2000)
		.popsize(25)
		.strategy(Strategy::CurrentToBest1Bin)
		.mutation(Mutation::Range { min: 0.4, max: 0.9 })
		.recombination(0.9)
		.tol(1e-14)
		.build();
	let report = differential_evolution(&mut rosenbrock, &b, c);
	assert!(report.fun < 1e-3, "fun={}", report.fun);
	assert!((report.x[0] - 1.0).abs() < 0.1);
	assert!((report.x[1] - 1.0).abs() < 0.2);
}

#[test]
fn test_de_fixed_variables_stay_fixed() {
	let b = vec![(-5.0, 5.0), (2.0, 2.0)];
	let c = DEConfigBuilder::new().seed(3).maxiter(300).tol(1e-12).init(Init::Random).build();
	let mut f = |x: &Array1<f64>| Fitness::new(x[0] * x[0] + x[1]);
	let report = differential_evolution(&mut f, &b, c);
	assert_eq!(report.x[1], 2.0);
	assert!(report.x[0].abs() < 1e-2);
}

#[test]
fn test_de_all_fixed_evaluates_once() {
	let b = vec![(1.0, 1.0), (2.0, 2.0)];
	let mut calls = 0usize;
	let mut f = |x: &Array1<f64>| {
		calls += 1;
		Fitness::new(x.sum())
	};
	let report = differential_evolution(&mut f, &b, DEConfigBuilder::new().build());
	assert_eq!(report.fun, 3.0);
	assert_eq!(report.nfev, 1);
	assert_eq!(calls, 1);
}

#[test]
fn test_de_same_seed_same_result() {
	let bounds = vec![(-5.0, 5.0); 3];
	let run = || {
		let c = DEConfigBuilder::new().seed(11).maxiter(50).build();
		differential_evolution(&mut sphere, &bounds, c)
	};
	let first = run();
	let second = run();
	assert_eq!(first.x, second.x);
	assert_eq!(first.fun, second.fun);
}

#[test]
fn test_de_callback_stops_early() {
	let b = vec![(-5.0, 5.0); 2];
	let c = DEConfigBuilder::new()
		.seed(5)
		.maxiter(1000)
		.tol(0.0)
		.callback(Box::new(|inter: &DEIntermediate| {
			if inter.iter >= 3 { CallbackAction::Stop } else { CallbackAction::Continue }
		}))
		.build();
	let report = differential_evolution(&mut sphere, &b, c);
	assert_eq!(report.nit, 3);
	assert!(report.message.contains("callback"));
}

#[test]
fn test_de_x0_is_the_last_initial_member() {
	let b = vec![(-5.0, 5.0), (-5.0, 5.0)];
	let x0 = Array1::from(vec![1.25, -0.75]);
	// popsize 4 on two free variables gives 8 members
	let c = DEConfigBuilder::new().seed(11).maxiter(1).popsize(4).x0(x0.clone()).build();
	let mut seen: Vec<Array1<f64>> = Vec::new();
	let mut f = |x: &Array1<f64>| {
		seen.push(x.clone());
		sphere(x)
	};
	differential_evolution(&mut f, &b, c);
	assert!(seen.len() >= 8);
	assert_eq!(seen[7], x0);
	assert!(seen[..7].iter().all(|x| *x != x0));
}
