//! optdriver - delegate model optimization to external NLP solvers
//! Common command-line interface definitions shared across binaries
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use clap::Args;
use std::path::PathBuf;
use std::process;

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::optimizer::OptionValue;
use crate::registry::{AlgorithmInfo, AlgorithmType, Library, get_all_algorithms};

/// Driver flags, meant to be flattened into a binary's own parser.
#[derive(Args, Debug, Clone, Default)]
pub struct DriverArgs {
    /// Optimization algorithm, e.g. nlopt:slsqp, mh:pso, optdriver:de.
    #[arg(long)]
    pub algo: Option<String>,

    /// Solver option as name=value; may be repeated.
    #[arg(short = 'o', long = "option", value_parser = parse_option)]
    pub options: Vec<(String, OptionValue)>,

    /// Let the solver compute gradients by finite differences.
    #[arg(long, default_value_t = false)]
    pub solver_fd: bool,

    /// Driver configuration file (.json, .yaml or .yml); flags override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store every evaluation in this CSV file.
    #[arg(long)]
    pub store_history: Option<PathBuf>,

    /// Replay a stored history before evaluating the model.
    #[arg(long)]
    pub hot_start: Option<PathBuf>,

    /// Title printed with the results.
    #[arg(long)]
    pub title: Option<String>,

    /// Skip the model run before the problem is built.
    #[arg(long, default_value_t = false)]
    pub no_initial_run: bool,

    /// Do not print the solution table.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Display available optimization algorithms and exit.
    #[arg(long, default_value_t = false)]
    pub algo_list: bool,
}

/// Parse `name=value`; the value is typed as bool, integer, float or text
pub fn parse_option(s: &str) -> Result<(String, OptionValue), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing option name in '{}'", s));
    }
    let value = match value.parse::<OptionValue>() {
        Ok(v) => v,
        Err(never) => match never {},
    };
    Ok((name.to_string(), value))
}

impl DriverArgs {
    /// Configuration file values, overridden by the flags that were given
    pub fn driver_config(&self) -> Result<DriverConfig, DriverError> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::from_file(path)?,
            None => DriverConfig::default(),
        };
        if let Some(algo) = &self.algo {
            config.optimizer = algo.clone();
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        for (name, value) in &self.options {
            config.options.insert(name.clone(), value.clone());
        }
        if self.solver_fd {
            config.use_solver_fd = true;
        }
        if self.no_initial_run {
            config.initial_run = false;
        }
        if self.quiet {
            config.print_results = false;
        }
        if self.store_history.is_some() {
            config.store_history = self.store_history.clone();
        }
        if self.hot_start.is_some() {
            config.hot_start = self.hot_start.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_group(title: &str, algos: &[&AlgorithmInfo]) {
    if algos.is_empty() {
        return;
    }
    println!("   {}:", title);
    for algo in algos {
        print!("   - {:<18}", algo.name);
        print!(" | Constraints: ");
        match (algo.supports_nonlinear_constraints, algo.supports_equality_constraints) {
            (true, true) => print!("ineq + eq"),
            (true, false) => print!("ineq only"),
            _ => print!("penalty  "),
        }
        print!(" | {}", if algo.uses_gradient { "gradient" } else { "no gradient" });
        if algo.supports_integers {
            print!(" | integers");
        }
        println!(" | {}", algo.description);
    }
}

/// Print every known algorithm grouped by library, then exit
pub fn display_algorithm_list() -> ! {
    println!("Available Optimization Algorithms");
    println!("=================================\n");

    for library in [Library::Nlopt, Library::Metaheuristics, Library::OptDriver] {
        let algos: Vec<&AlgorithmInfo> = get_all_algorithms()
            .iter()
            .filter(|a| a.library == library)
            .collect();
        if algos.is_empty() {
            continue;
        }
        let status = if library.is_available() { "" } else { " (not compiled in)" };
        println!("{} Library Algorithms{}:", library, status);

        let (global, local): (Vec<&AlgorithmInfo>, Vec<&AlgorithmInfo>) = algos
            .into_iter()
            .partition(|a| a.algorithm_type == AlgorithmType::Global);
        print_group("Global Optimizers (best for exploring solution space)", &global);
        print_group("Local Optimizers (fast convergence from the starting point)", &local);
        println!();
    }

    println!("Usage:");
    println!("   --algo nlopt:slsqp -o maxeval=500 -o ftol_rel=1e-10");
    println!("   --algo optdriver:de -o seed=1 -o strategy=currenttobest1bin");
    process::exit(0);
}
