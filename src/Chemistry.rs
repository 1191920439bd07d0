//! # Chemistry and property providers
//!
//! The splitting core never computes thermochemistry itself. It talks to a
//! [`chemistry_api::ChemistryProvider`], which returns density, molecular
//! weights, enthalpies, heat capacities and reaction rates for an installed
//! `(Y, T)` state.
//!
//! ## Modules
//! - `chemistry_api` - the provider trait and `ChemistryError`
//! - `nasa7` - NASA-7 polynomial thermodynamics
//! - `elementary_kinetics` - Arrhenius rate constants and mass-action reactions
//! - `ideal_gas` - `IdealGasMixture`, the reference provider
//! - `mechanisms` - small ready-made mixtures
pub mod chemistry_api;
pub mod elementary_kinetics;
pub mod ideal_gas;
pub mod mechanisms;
pub mod nasa7;
