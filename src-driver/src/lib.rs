//! optdriver - delegate model optimization to external NLP solvers
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
//!
//! The crate sits between a model host (anything implementing [`Host`]) and a
//! solver backend (anything implementing [`Optimizer`]):
//!
//! - `optdriver_de`: native Differential Evolution solver
//! - `nlopt`: NLOPT algorithms (feature `nlopt`)
//! - `metaheuristics-nature`: population based algorithms (feature `mh`)

// Re-export the native solver crate
pub use optdriver_de as de;

/// Evaluation and gradient callbacks handed to solvers
pub mod callbacks;
/// Command-line arguments shared by binaries
pub mod cli;
/// Serializable driver configuration
pub mod config;
/// The optimization driver itself
pub mod driver;
/// Error types
pub mod error;
/// Evaluation history store and hot start
pub mod history;
/// In-memory model host
pub mod model;
/// Optimizer capability, options and solutions
pub mod optimizer;
/// Parameter metadata and classification
pub mod parameter;
/// Solver-facing problem description
pub mod problem;
/// Registry of known algorithms
pub mod registry;
/// Host capability
pub mod host;
/// Parameter values and type descriptors
pub mod value;

mod optim_de;
#[cfg(feature = "mh")]
mod optim_mh;
#[cfg(feature = "nlopt")]
mod optim_nlopt;

// Re-export commonly used items
pub use callbacks::{Callbacks, DriverCallbacks, Evaluation, Gradient};
pub use config::DriverConfig;
pub use driver::OptimizationDriver;
pub use error::{DriverError, HostError};
pub use host::{ConstraintSpec, Host};
pub use model::{Model, State};
pub use optimizer::{OptionValue, Optimizer, Sensitivity, Solution};
pub use parameter::{ParameterSpec, VariableKind};
pub use problem::{Comparison, ConstraintEntry, ConstraintKind, Problem, Variable};
pub use registry::*;
pub use value::{Scalar, ValueType};
