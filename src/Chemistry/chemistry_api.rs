//! Contract between the splitting core and whatever evaluates thermochemical
//! properties and reaction rates.
//!
//! The provider is stateful in the same way a Cantera phase object is: the
//! state is installed with [`ChemistryProvider::set_state_mass`] and all
//! getters refer to the last installed state. A provider instance must
//! therefore never be shared between concurrently running point systems;
//! parallel code clones it per worker (see `SourceTerms::parallel_points`).
//!
//! Units follow the kmol convention used throughout the crate:
//!
//! | quantity | unit |
//! |----------|------|
//! | molecular weight | kg/kmol |
//! | density | kg/m³ |
//! | molar enthalpy | J/kmol |
//! | molar heat capacity | J/(kmol·K) |
//! | mass heat capacity | J/(kg·K) |
//! | production rates | kmol/(m³·s) |
use thiserror::Error;

/// Universal gas constant in J/(kmol·K)
pub const GAS_CONSTANT: f64 = 8314.462618;
/// Mass fractions below `-NEGATIVE_Y_TOLERANCE` are rejected as unphysical
pub const NEGATIVE_Y_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChemistryError {
    #[error("invalid temperature: {0} K")]
    InvalidTemperature(f64),
    #[error("invalid mass fraction {value} for species {species}")]
    InvalidComposition { species: usize, value: f64 },
    #[error("non-finite production rate for species {0}")]
    NonFiniteRate(usize),
    #[error("species count mismatch: provider has {expected}, got {got}")]
    SpeciesCountMismatch { expected: usize, got: usize },
    #[error("cannot parse reaction equation: {0}")]
    BadEquation(String),
}

pub trait ChemistryProvider {
    fn n_species(&self) -> usize;
    /// installs temperature and (unnormalized) mass fractions
    fn set_state_mass(&mut self, y: &[f64], t: f64) -> Result<(), ChemistryError>;
    fn pressure(&self) -> f64;
    fn density(&self) -> f64;
    fn mixture_molecular_weight(&self) -> f64;
    fn molecular_weights(&self) -> &[f64];
    /// mass-specific heat capacity of the mixture
    fn cp_mass(&self) -> f64;
    /// molar enthalpies of all species
    fn enthalpies(&self, hk: &mut [f64]);
    /// molar heat capacities of all species
    fn specific_heats(&self, cp_spec: &mut [f64]);
    fn net_production_rates(&self, wdot: &mut [f64]) -> Result<(), ChemistryError>;
    /// creation and destruction rates, `wdot = wq - wd`
    fn creation_destruction_rates(
        &self,
        wq: &mut [f64],
        wd: &mut [f64],
    ) -> Result<(), ChemistryError>;
}

/// validation shared by providers: positive finite temperature, finite
/// mass fractions not below the negative tolerance
pub fn validate_state(y: &[f64], t: f64, n_species: usize) -> Result<(), ChemistryError> {
    if y.len() != n_species {
        return Err(ChemistryError::SpeciesCountMismatch {
            expected: n_species,
            got: y.len(),
        });
    }
    if !t.is_finite() || t <= 0.0 {
        return Err(ChemistryError::InvalidTemperature(t));
    }
    for (k, &yk) in y.iter().enumerate() {
        if !yk.is_finite() || yk < -NEGATIVE_Y_TOLERANCE {
            return Err(ChemistryError::InvalidComposition {
                species: k,
                value: yk,
            });
        }
    }
    Ok(())
}

/// checks the output of a rate evaluation
pub fn check_rates(rates: &[f64]) -> Result<(), ChemistryError> {
    match rates.iter().position(|r| !r.is_finite()) {
        Some(k) => Err(ChemistryError::NonFiniteRate(k)),
        None => Ok(()),
    }
}
