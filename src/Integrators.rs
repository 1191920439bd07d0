//! # Time integrator framework
//!
//! Fixed-step steppers used for the sub-steps of an operator-splitting cycle.
//!
//! | Stepper | System trait | Scheme |
//! |---------|--------------|--------|
//! | `ExplicitIntegrator` | `Ode` | forward Euler, `y += h f(t, y)` |
//! | `BdfIntegrator` | `LinearOde` | backward Euler, `(I - h A) y1 = y0 + h c` |
//!
//! `band_matrix` holds the banded storage and LU factorization used by the
//! implicit stepper.
pub mod band_matrix;
pub mod bdf_integrator;
pub mod explicit_integrator;
pub mod integrator;
mod integrator_tests;
