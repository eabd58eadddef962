//! optdriver - delegate model optimization to external NLP solvers
//! Run a canned test problem through the optimization driver
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

use clap::Parser;
use std::error::Error;
use std::process;

use optdriver::OptimizationDriver;
use optdriver::cli::{DriverArgs, display_algorithm_list};
use optdriver_testfunctions::{get_problem, get_problem_metadata};

#[derive(Parser, Debug)]
#[command(author, about = "Run a canned optimization problem", long_about = None)]
struct Args {
    /// Problem name (see --problem-list).
    #[arg(short, long, default_value = "paraboloid")]
    problem: String,

    /// List the available problems and exit.
    #[arg(long, default_value_t = false)]
    problem_list: bool,

    /// With --problem-list, print the metadata as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(flatten)]
    driver: DriverArgs,
}

fn display_problem_list(json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(get_problem_metadata())?);
        return Ok(());
    }
    println!("Available Problems");
    println!("==================\n");
    for meta in get_problem_metadata() {
        let optimum = meta
            .optimum
            .map(|v| format!("{:.6}", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   - {:<20} | {:<13} | optimum {:>12} | {:<14} | {}",
            meta.name, meta.category, optimum, meta.suggested_algorithm, meta.description
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.driver.algo_list {
        display_algorithm_list();
    }
    if args.problem_list {
        return display_problem_list(args.json);
    }

    let Some(mut model) = get_problem(&args.problem) else {
        eprintln!("unknown problem '{}', use --problem-list", args.problem);
        process::exit(2);
    };

    let mut config = args.driver.driver_config()?;
    if args.driver.title.is_none() {
        config.title = format!("{} with {}", args.problem, config.optimizer);
    }
    log::info!("running {} with {}", args.problem, config.optimizer);

    let mut driver = OptimizationDriver::new(config);
    let solution = driver.run(&mut model)?;
    if !solution.success {
        log::warn!("solver did not report success: {}", solution.message);
    }
    Ok(())
}
