//! # Ideal-gas reference provider
//!
//! `IdealGasMixture` is a small, self-contained implementation of
//! [`ChemistryProvider`]: NASA-7 thermodynamics and elementary mass-action
//! kinetics at constant pressure. It is what the tests and the demonstration
//! driver run against, and it is the template for wrapping a full
//! thermochemistry library.
//!
//! ## Example
//! ```
//! use SplitFlame::Chemistry::ideal_gas::IdealGasMixture;
//! use SplitFlame::Chemistry::nasa7::Nasa7;
//! use SplitFlame::Chemistry::elementary_kinetics::Arrhenius;
//! use SplitFlame::Chemistry::chemistry_api::ChemistryProvider;
//!
//! let mut gas = IdealGasMixture::new(101325.0);
//! gas.add_species("A", 20.0, Nasa7::constant_cp(3.5, 0.0));
//! gas.add_species("B", 20.0, Nasa7::constant_cp(3.5, -1.0e8));
//! gas.add_reaction("A => B", Arrhenius::new(1e8, 0.0, 8e7)).unwrap();
//! gas.set_state_mass(&[0.6, 0.4], 1500.0).unwrap();
//! assert!(gas.density() > 0.0);
//! ```
use super::chemistry_api::{
    ChemistryError, ChemistryProvider, GAS_CONSTANT, check_rates, validate_state,
};
use super::elementary_kinetics::{Arrhenius, ElementaryReaction};
use super::nasa7::Nasa7;

#[derive(Debug, Clone)]
pub struct IdealGasMixture {
    pub species: Vec<String>,
    /// molecular weights, kg/kmol
    pub W: Vec<f64>,
    pub thermo: Vec<Nasa7>,
    pub reactions: Vec<ElementaryReaction>,
    /// pressure, Pa
    pub P: f64,
    // last installed state
    T: f64,
    Y: Vec<f64>,
    rho: f64,
    Wmx: f64,
    conc: Vec<f64>,
}

impl IdealGasMixture {
    pub fn new(pressure: f64) -> Self {
        Self {
            species: Vec::new(),
            W: Vec::new(),
            thermo: Vec::new(),
            reactions: Vec::new(),
            P: pressure,
            T: 0.0,
            Y: Vec::new(),
            rho: 0.0,
            Wmx: 0.0,
            conc: Vec::new(),
        }
    }

    pub fn add_species(&mut self, name: &str, molecular_weight: f64, thermo: Nasa7) {
        self.species.push(name.to_string());
        self.W.push(molecular_weight);
        self.thermo.push(thermo);
        self.Y.push(0.0);
        self.conc.push(0.0);
    }

    pub fn add_reaction(&mut self, equation: &str, forward: Arrhenius) -> Result<(), ChemistryError> {
        let reaction = ElementaryReaction::from_equation(equation, &self.species, forward)?;
        self.reactions.push(reaction);
        Ok(())
    }

    pub fn push_reaction(&mut self, reaction: ElementaryReaction) {
        self.reactions.push(reaction);
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s == name)
    }

    pub fn temperature(&self) -> f64 {
        self.T
    }
}

impl ChemistryProvider for IdealGasMixture {
    fn n_species(&self) -> usize {
        self.species.len()
    }

    fn set_state_mass(&mut self, y: &[f64], t: f64) -> Result<(), ChemistryError> {
        validate_state(y, t, self.species.len())?;
        self.T = t;
        self.Y.copy_from_slice(y);
        let inv_wmx: f64 = y.iter().zip(&self.W).map(|(yk, wk)| yk / wk).sum();
        if !(inv_wmx > 0.0) {
            return Err(ChemistryError::InvalidComposition {
                species: 0,
                value: inv_wmx,
            });
        }
        self.Wmx = 1.0 / inv_wmx;
        self.rho = self.P * self.Wmx / (GAS_CONSTANT * t);
        for k in 0..y.len() {
            self.conc[k] = self.rho * y[k] / self.W[k];
        }
        Ok(())
    }

    fn pressure(&self) -> f64 {
        self.P
    }

    fn density(&self) -> f64 {
        self.rho
    }

    fn mixture_molecular_weight(&self) -> f64 {
        self.Wmx
    }

    fn molecular_weights(&self) -> &[f64] {
        &self.W
    }

    fn cp_mass(&self) -> f64 {
        self.thermo
            .iter()
            .zip(self.Y.iter().zip(&self.W))
            .map(|(th, (yk, wk))| yk * th.cp(self.T) / wk)
            .sum()
    }

    fn enthalpies(&self, hk: &mut [f64]) {
        for (h, th) in hk.iter_mut().zip(&self.thermo) {
            *h = th.enthalpy(self.T);
        }
    }

    fn specific_heats(&self, cp_spec: &mut [f64]) {
        for (c, th) in cp_spec.iter_mut().zip(&self.thermo) {
            *c = th.cp(self.T);
        }
    }

    fn net_production_rates(&self, wdot: &mut [f64]) -> Result<(), ChemistryError> {
        let n = self.species.len();
        let mut wq = vec![0.0; n];
        let mut wd = vec![0.0; n];
        self.creation_destruction_rates(&mut wq, &mut wd)?;
        for k in 0..n {
            wdot[k] = wq[k] - wd[k];
        }
        Ok(())
    }

    fn creation_destruction_rates(
        &self,
        wq: &mut [f64],
        wd: &mut [f64],
    ) -> Result<(), ChemistryError> {
        wq.iter_mut().for_each(|w| *w = 0.0);
        wd.iter_mut().for_each(|w| *w = 0.0);
        for reaction in &self.reactions {
            reaction.add_contribution(self.T, &self.conc, wq, wd);
        }
        check_rates(wq)?;
        check_rates(wd)?;
        Ok(())
    }
}
