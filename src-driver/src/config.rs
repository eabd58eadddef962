use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DriverError;
use crate::optimizer::OptionValue;
use crate::registry::{available_names, find_algorithm_info};

/// Default algorithm: SLSQP when NLOPT is compiled in, the native DE otherwise
pub fn default_optimizer() -> String {
    if cfg!(feature = "nlopt") {
        "nlopt:slsqp".to_string()
    } else {
        "optdriver:de".to_string()
    }
}

/// Everything a run needs besides the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Algorithm name, with or without library prefix
    pub optimizer: String,
    pub title: String,
    /// Passed verbatim to the optimizer, in name order
    pub options: BTreeMap<String, OptionValue>,
    /// Let the solver difference the objective instead of asking the host
    pub use_solver_fd: bool,
    pub print_results: bool,
    /// Run the model once before building the problem
    pub initial_run: bool,
    pub store_history: Option<PathBuf>,
    pub hot_start: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            optimizer: default_optimizer(),
            title: "Optimization using optdriver".to_string(),
            options: BTreeMap::new(),
            use_solver_fd: false,
            print_results: true,
            initial_run: true,
            store_history: None,
            hot_start: None,
        }
    }
}

enum Format {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> Result<Format, DriverError> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => Ok(Format::Json),
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        _ => Err(DriverError::Config(format!(
            "{}: expected a .json, .yaml or .yml file",
            path.display()
        ))),
    }
}

impl DriverConfig {
    /// Load a configuration from JSON or YAML, chosen by file extension
    pub fn from_file(path: &Path) -> Result<Self, DriverError> {
        let format = format_of(path)?;
        let text = fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {}", path.display(), e)))?;
        let config: DriverConfig = match format {
            Format::Json => serde_json::from_str(&text)
                .map_err(|e| DriverError::Config(format!("{}: {}", path.display(), e)))?,
            Format::Yaml => serde_yaml::from_str(&text)
                .map_err(|e| DriverError::Config(format!("{}: {}", path.display(), e)))?,
        };
        log::info!("loaded driver configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), DriverError> {
        let text = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self).map_err(|e| DriverError::Config(e.to_string()))?,
            Format::Yaml => serde_yaml::to_string(self).map_err(|e| DriverError::Config(e.to_string()))?,
        };
        fs::write(path, text).map_err(|e| DriverError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Check the optimizer name against the installed algorithms
    pub fn validate(&self) -> Result<(), DriverError> {
        let unsupported = || DriverError::UnsupportedOptimizer {
            name: self.optimizer.clone(),
            available: available_names(),
        };
        let info = find_algorithm_info(&self.optimizer).ok_or_else(unsupported)?;
        if !info.library.is_available() {
            return Err(unsupported());
        }
        Ok(())
    }

    pub fn with_option(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = DriverConfig::default();
        assert!(config.print_results);
        assert!(config.initial_run);
        assert!(!config.use_solver_fd);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("driver.yaml");
        fs::write(
            &path,
            "optimizer: optdriver:de\noptions:\n  maxiter: 50\n  strategy: rand1bin\n  tol: 1.0e-8\n  disp: true\n",
        )
        .unwrap();
        let config = DriverConfig::from_file(&path).unwrap();
        assert_eq!(config.optimizer, "optdriver:de");
        assert_eq!(config.options["maxiter"], OptionValue::Int(50));
        assert_eq!(config.options["strategy"], OptionValue::Text("rand1bin".into()));
        assert_eq!(config.options["tol"], OptionValue::Float(1e-8));
        assert_eq!(config.options["disp"], OptionValue::Bool(true));
        assert!(config.print_results);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("driver.json");
        let mut config = DriverConfig::default()
            .with_option("maxeval", 300i64)
            .with_option("ftol_rel", 1e-10);
        config.store_history = Some(dir.path().join("hist.csv"));
        config.to_file(&path).unwrap();
        assert_eq!(DriverConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn unknown_extension_and_optimizer() {
        let err = DriverConfig::from_file(Path::new("driver.toml")).unwrap_err();
        assert_eq!(err.category(), "Config");

        let config = DriverConfig {
            optimizer: "SNOPT".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DriverError::UnsupportedOptimizer { .. })));
    }
}
