//! # Chemical source terms at single grid nodes
//!
//! ## Modules
//! - `source_system` - `SourceSystem`, right-hand side with analytic and
//!   finite-difference Jacobians
//! - `linearized_source` - `SourceSystem` frozen into `ydot = A y + c` for the
//!   implicit banded stepper
//! - `qss_integrator` - quasi-steady-state predictor-corrector stepper
//! - `source_system_qss` - `SourceSystemQss`, production/destruction form
//!   driven by the QSS stepper
//! - `parallel_points` - parallel map of a reaction sub-step over nodes
pub mod linearized_source;
pub mod parallel_points;
pub mod qss_integrator;
pub mod source_system;
pub mod source_system_qss;
mod source_system_tests;
