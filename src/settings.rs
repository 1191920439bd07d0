//! # Settings Module
//!
//! ## Purpose
//! Read-only options record consumed by the splitting core. The core only
//! reads named numeric and boolean fields; how the record is produced
//! (input files, GUI, scripts) is up to the caller.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "qss_eps_min": 0.02,
//!   "qss_eps_max": 10.0,
//!   "qss_dt_min": 1e-16,
//!   "qss_dt_max": 1e-6,
//!   "qss_iteration_count": 1,
//!   "qss_abs_tol": 1e-11,
//!   "qss_min_val": 1e-60,
//!   "qss_stability_check": false,
//!   "chemistry_integrator": "Qss",
//!   "fd_jacobian": false,
//!   "pressure": 101325.0,
//!   "global_timestep": 5e-6,
//!   "log_level": "info"
//! }
//! ```
//! Missing fields take their default values; unknown fields are an error.
//!
//! ## Usage
//! ```rust
//! use SplitFlame::settings::ConfigOptions;
//!
//! let options = ConfigOptions::from_json_str(r#"{ "qss_eps_min": 0.01 }"#).unwrap();
//! assert_eq!(options.qss_eps_min, 0.01);
//! assert_eq!(options.qss_iteration_count, 1);
//! ```
use crate::errors::SplitError;
use log::{LevelFilter, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which point reaction system advances the chemistry sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChemistryIntegrator {
    /// `SourceSystemQss` with the quasi-steady-state stepper
    Qss,
    /// `SourceSystem` linearized and stepped with the banded implicit integrator
    Linearized,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOptions {
    /// relative accuracy target of the QSS corrector
    pub qss_eps_min: f64,
    /// normalized error above which a QSS step is rejected
    pub qss_eps_max: f64,
    pub qss_dt_min: f64,
    pub qss_dt_max: f64,
    /// number of corrector iterations per QSS step
    pub qss_iteration_count: usize,
    /// values smaller than this are ignored in the QSS error estimate
    pub qss_abs_tol: f64,
    /// lower bound enforced on mass fractions by the QSS stepper
    pub qss_min_val: f64,
    /// limit step growth when a component oscillates between steps
    pub qss_stability_check: bool,
    pub chemistry_integrator: ChemistryIntegrator,
    /// use the finite-difference Jacobian in the linearized reaction step
    pub fd_jacobian: bool,
    /// Pa
    pub pressure: f64,
    /// length of one splitting cycle, s
    pub global_timestep: f64,
    /// "error", "warn", "info", "debug", "trace" or "off"
    pub log_level: String,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            qss_eps_min: 2e-2,
            qss_eps_max: 1e1,
            qss_dt_min: 1e-16,
            qss_dt_max: 1e-6,
            qss_iteration_count: 1,
            qss_abs_tol: 1e-11,
            qss_min_val: 1e-60,
            qss_stability_check: false,
            chemistry_integrator: ChemistryIntegrator::Qss,
            fd_jacobian: false,
            pressure: 101325.0,
            global_timestep: 5e-6,
            log_level: "info".to_string(),
        }
    }
}

impl ConfigOptions {
    pub fn from_json_str(json: &str) -> Result<Self, SplitError> {
        let options: ConfigOptions = serde_json::from_str(json)
            .map_err(|e| SplitError::Config(format!("failed to parse options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SplitError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SplitError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let options = Self::from_json_str(&content)?;
        info!("options loaded from '{}'", path.display());
        Ok(options)
    }

    pub fn to_json_string(&self) -> Result<String, SplitError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SplitError::Config(format!("failed to serialize options: {}", e)))
    }

    /// checks the numeric ranges the core relies on
    pub fn validate(&self) -> Result<(), SplitError> {
        if !(self.qss_eps_min > 0.0) || !(self.qss_eps_max > 0.0) {
            return Err(SplitError::Config(
                "qss_eps_min and qss_eps_max must be positive".to_string(),
            ));
        }
        if !(self.qss_dt_min > 0.0) || self.qss_dt_max < self.qss_dt_min {
            return Err(SplitError::Config(format!(
                "invalid QSS step bounds: dt_min = {}, dt_max = {}",
                self.qss_dt_min, self.qss_dt_max
            )));
        }
        if self.qss_iteration_count == 0 {
            return Err(SplitError::Config(
                "qss_iteration_count must be at least 1".to_string(),
            ));
        }
        if !(self.pressure > 0.0) || !(self.global_timestep > 0.0) {
            return Err(SplitError::Config(
                "pressure and global_timestep must be positive".to_string(),
            ));
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, SplitError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| SplitError::Config(format!("unknown log level '{}'", self.log_level)))
    }
}
