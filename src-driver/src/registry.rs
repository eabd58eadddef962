use std::fmt;
use std::sync::LazyLock;

use crate::error::DriverError;
use crate::optim_de::NativeDe;
use crate::optimizer::Optimizer;

/// Library providing an algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Library {
    Nlopt,
    Metaheuristics,
    OptDriver,
}

impl Library {
    /// Whether the backend for this library is compiled in
    pub fn is_available(self) -> bool {
        match self {
            Library::Nlopt => cfg!(feature = "nlopt"),
            Library::Metaheuristics => cfg!(feature = "mh"),
            Library::OptDriver => true,
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Library::Nlopt => "NLOPT",
            Library::Metaheuristics => "Metaheuristics",
            Library::OptDriver => "OptDriver",
        };
        write!(f, "{}", s)
    }
}

/// Algorithm classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmType {
    /// Explores the whole box, good for finding the global optimum
    Global,
    /// Refines from the starting point, fast but may stop in a local optimum
    Local,
}

/// Algorithm metadata structure
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmInfo {
    /// Algorithm name with library prefix (e.g., "nlopt:slsqp", "mh:pso", "optdriver:de")
    pub name: &'static str,
    pub library: Library,
    pub algorithm_type: AlgorithmType,
    /// Inequality constraints handled natively (otherwise folded into a penalty)
    pub supports_nonlinear_constraints: bool,
    /// Equality constraints handled natively
    pub supports_equality_constraints: bool,
    /// Needs derivatives of objectives and constraints
    pub uses_gradient: bool,
    /// Keeps integer and discrete variables integral
    pub supports_integers: bool,
    pub description: &'static str,
}

impl AlgorithmInfo {
    /// Name without the library prefix
    pub fn short_name(&self) -> &'static str {
        self.name.split(':').nth(1).unwrap_or(self.name)
    }
}

const fn algo(
    name: &'static str,
    library: Library,
    algorithm_type: AlgorithmType,
    constraints: (bool, bool),
    uses_gradient: bool,
    description: &'static str,
) -> AlgorithmInfo {
    AlgorithmInfo {
        name,
        library,
        algorithm_type,
        supports_nonlinear_constraints: constraints.0,
        supports_equality_constraints: constraints.1,
        uses_gradient,
        supports_integers: matches!(library, Library::OptDriver),
        description,
    }
}

use AlgorithmType::{Global, Local};
use Library::{Metaheuristics, Nlopt, OptDriver};

static ALGORITHMS: [AlgorithmInfo; 22] = [
    // NLOPT - global
    algo("nlopt:isres", Nlopt, Global, (true, true), false, "Improved Stochastic Ranking Evolution Strategy"),
    algo("nlopt:ags", Nlopt, Global, (true, false), false, "Adaptive Geometric Search"),
    algo("nlopt:origdirect", Nlopt, Global, (true, false), false, "DIRECT global optimization (original version)"),
    algo("nlopt:crs2lm", Nlopt, Global, (false, false), false, "Controlled Random Search with local mutation"),
    algo("nlopt:direct", Nlopt, Global, (false, false), false, "DIRECT global optimization"),
    algo("nlopt:directl", Nlopt, Global, (false, false), false, "DIRECT-L (locally biased version)"),
    algo("nlopt:stogo", Nlopt, Global, (false, false), true, "Stochastic Global Optimization"),
    algo("nlopt:stogorand", Nlopt, Global, (false, false), true, "StoGO with randomized search"),
    // NLOPT - local
    algo("nlopt:slsqp", Nlopt, Local, (true, true), true, "Sequential Least Squares Programming"),
    algo("nlopt:mma", Nlopt, Local, (true, false), true, "Method of Moving Asymptotes"),
    algo("nlopt:ccsaq", Nlopt, Local, (true, false), true, "Conservative convex separable quadratic approximations"),
    algo("nlopt:lbfgs", Nlopt, Local, (false, false), true, "Limited-memory BFGS"),
    algo("nlopt:cobyla", Nlopt, Local, (true, true), false, "Constrained Optimization BY Linear Approximations"),
    algo("nlopt:bobyqa", Nlopt, Local, (false, false), false, "Bound Optimization BY Quadratic Approximation"),
    algo("nlopt:neldermead", Nlopt, Local, (false, false), false, "Nelder-Mead simplex"),
    algo("nlopt:sbplx", Nlopt, Local, (false, false), false, "Subplex (Nelder-Mead on subspaces)"),
    // Metaheuristics (penalty folded constraints)
    algo("mh:de", Metaheuristics, Global, (false, false), false, "Differential Evolution"),
    algo("mh:pso", Metaheuristics, Global, (false, false), false, "Particle Swarm Optimization"),
    algo("mh:rga", Metaheuristics, Global, (false, false), false, "Real-coded Genetic Algorithm"),
    algo("mh:tlbo", Metaheuristics, Global, (false, false), false, "Teaching-Learning Based Optimization"),
    algo("mh:firefly", Metaheuristics, Global, (false, false), false, "Firefly Algorithm"),
    // Native
    algo("optdriver:de", OptDriver, Global, (true, true), false, "Differential Evolution with feasibility rules and integer variables"),
];

/// Get all known algorithms with their metadata, available or not
pub fn get_all_algorithms() -> &'static [AlgorithmInfo] {
    &ALGORITHMS
}

static AVAILABLE: LazyLock<Vec<&'static AlgorithmInfo>> = LazyLock::new(|| {
    ALGORITHMS
        .iter()
        .filter(|a| a.library.is_available())
        .collect()
});

/// Algorithms whose backend is compiled into this build
pub fn available_algorithms() -> &'static [&'static AlgorithmInfo] {
    AVAILABLE.as_slice()
}

pub fn available_names() -> Vec<String> {
    available_algorithms().iter().map(|a| a.name.to_string()).collect()
}

/// Find algorithm info by name (prefixed or unprefixed, case insensitive)
pub fn find_algorithm_info(name: &str) -> Option<&'static AlgorithmInfo> {
    let name = name.trim();
    // First try exact match
    if let Some(algo) = ALGORITHMS.iter().find(|a| a.name.eq_ignore_ascii_case(name)) {
        return Some(algo);
    }
    // Then the suffix; "fa" is accepted for firefly
    let suffix = if name.eq_ignore_ascii_case("fa") { "firefly" } else { name };
    // installed backends win when several libraries share a suffix
    find_by_suffix(available_algorithms().iter().copied(), suffix)
        .or_else(|| find_by_suffix(ALGORITHMS.iter(), suffix))
}

fn find_by_suffix(
    mut candidates: impl Iterator<Item = &'static AlgorithmInfo>,
    suffix: &str,
) -> Option<&'static AlgorithmInfo> {
    candidates.find(|a| a.short_name().eq_ignore_ascii_case(suffix))
}

/// Instantiate an available algorithm by name
pub fn create_optimizer(name: &str) -> Result<Box<dyn Optimizer>, DriverError> {
    let unsupported = || DriverError::UnsupportedOptimizer {
        name: name.to_string(),
        available: available_names(),
    };
    let info = find_algorithm_info(name).ok_or_else(unsupported)?;
    if !info.library.is_available() {
        return Err(unsupported());
    }
    match info.library {
        #[cfg(feature = "nlopt")]
        Library::Nlopt => Ok(Box::new(crate::optim_nlopt::NloptOptimizer::new(info)?)),
        #[cfg(feature = "mh")]
        Library::Metaheuristics => Ok(Box::new(crate::optim_mh::MhOptimizer::new(info))),
        Library::OptDriver => Ok(Box::new(NativeDe::new(info))),
        #[allow(unreachable_patterns)]
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_prefix_and_case_insensitive() {
        assert_eq!(find_algorithm_info("nlopt:slsqp").unwrap().name, "nlopt:slsqp");
        assert_eq!(find_algorithm_info("SLSQP").unwrap().name, "nlopt:slsqp");
        assert_eq!(find_algorithm_info("Optdriver:DE").unwrap().name, "optdriver:de");
        assert_eq!(find_algorithm_info("fa").unwrap().name, "mh:firefly");
        assert!(find_algorithm_info("snopt").is_none());
    }

    #[test]
    fn unprefixed_name_prefers_installed_library() {
        // "de" exists for several libraries; the first installed one wins
        let expected = if cfg!(feature = "mh") { "mh:de" } else { "optdriver:de" };
        assert_eq!(find_algorithm_info("de").unwrap().name, expected);
        assert!(create_optimizer("de").is_ok());

        let without_mh = ALGORITHMS.iter().filter(|a| a.library != Library::Metaheuristics);
        assert_eq!(find_by_suffix(without_mh, "de").unwrap().name, "optdriver:de");
        assert_eq!(find_by_suffix(ALGORITHMS.iter(), "de").unwrap().name, "mh:de");
    }

    #[test]
    fn native_de_is_always_available() {
        assert!(available_names().contains(&"optdriver:de".to_string()));
        let opt = create_optimizer("optdriver:de").unwrap();
        assert_eq!(opt.info().name, "optdriver:de");
        assert!(opt.info().supports_integers);
    }

    #[test]
    fn unknown_name_lists_installed() {
        match create_optimizer("SNOPT") {
            Err(DriverError::UnsupportedOptimizer { name, available }) => {
                assert_eq!(name, "SNOPT");
                assert_eq!(available, available_names());
            }
            other => panic!("unexpected {:?}", other.map(|o| o.info().name)),
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = get_all_algorithms().iter().map(|a| a.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), get_all_algorithms().len());
    }
}
