use super::chemistry_api::{ChemistryError, GAS_CONSTANT};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Arrhenius form of the rate constant `k = A T^n exp(-E/(R T))`, `E` in J/kmol
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[allow(non_snake_case)]
pub struct Arrhenius {
    pub A: f64,
    pub n: f64,
    pub E: f64,
}

impl Arrhenius {
    #[allow(non_snake_case)]
    pub fn new(A: f64, n: f64, E: f64) -> Self {
        Self { A, n, E }
    }
    pub fn k(&self, t: f64) -> f64 {
        self.A * t.powf(self.n) * f64::exp(-self.E / (GAS_CONSTANT * t))
    }
}

/// Elementary reaction with mass-action kinetics. Stoichiometry is kept as
/// (species index, coefficient) pairs; the coefficients are also the
/// concentration exponents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementaryReaction {
    pub equation: String,
    pub reactants: Vec<(usize, f64)>,
    pub products: Vec<(usize, f64)>,
    pub forward: Arrhenius,
    /// explicit reverse rate constant, `None` for an irreversible reaction
    pub reverse: Option<Arrhenius>,
}

fn concentration_power(c: f64, nu: f64) -> f64 {
    if nu.fract() == 0.0 {
        c.powi(nu as i32)
    } else {
        c.max(0.0).powf(nu)
    }
}

impl ElementaryReaction {
    pub fn new(reactants: Vec<(usize, f64)>, products: Vec<(usize, f64)>, forward: Arrhenius) -> Self {
        Self {
            equation: String::new(),
            reactants,
            products,
            forward,
            reverse: None,
        }
    }

    pub fn with_reverse(mut self, reverse: Arrhenius) -> Self {
        self.reverse = Some(reverse);
        self
    }

    /// Parses `"2A + B => C"` against a list of species names. A term is an
    /// optional coefficient, an optional `*` and a species name.
    pub fn from_equation(
        equation: &str,
        species: &[String],
        forward: Arrhenius,
    ) -> Result<Self, ChemistryError> {
        let re = Regex::new(r"^(\d+(?:\.\d*)?)?\*?\s*(\S+)$")
            .map_err(|e| ChemistryError::BadEquation(e.to_string()))?;
        let bad = |msg: String| ChemistryError::BadEquation(format!("{} in '{}'", msg, equation));
        let (lhs, rhs) = match equation.split_once("=>") {
            Some((lhs, rhs)) if !rhs.contains("=>") => (lhs, rhs),
            _ => return Err(bad("expected exactly one '=>'".to_string())),
        };
        let parse_side = |side: &str| -> Result<Vec<(usize, f64)>, ChemistryError> {
            let mut terms = Vec::new();
            for term in side.split('+') {
                let term = term.trim();
                let cap = re
                    .captures(term)
                    .ok_or_else(|| bad(format!("malformed term '{}'", term)))?;
                let coeff = match cap.get(1) {
                    Some(m) => m
                        .as_str()
                        .parse::<f64>()
                        .map_err(|e| bad(format!("bad coefficient '{}': {}", m.as_str(), e)))?,
                    None => 1.0,
                };
                let name = &cap[2];
                let index = species
                    .iter()
                    .position(|s| s == name)
                    .ok_or_else(|| bad(format!("unknown species '{}'", name)))?;
                terms.push((index, coeff));
            }
            Ok(terms)
        };
        let reactants = parse_side(lhs)?;
        let products = parse_side(rhs)?;
        let mut reaction = Self::new(reactants, products, forward);
        reaction.equation = equation.trim().to_string();
        Ok(reaction)
    }

    /// forward and reverse rates of progress, kmol/(m³·s)
    pub fn rates_of_progress(&self, t: f64, conc: &[f64]) -> (f64, f64) {
        let qf = self
            .reactants
            .iter()
            .fold(self.forward.k(t), |acc, &(k, nu)| acc * concentration_power(conc[k], nu));
        let qr = match &self.reverse {
            Some(rev) => self
                .products
                .iter()
                .fold(rev.k(t), |acc, &(k, nu)| acc * concentration_power(conc[k], nu)),
            None => 0.0,
        };
        (qf, qr)
    }

    /// adds this reaction's contribution to creation and destruction rates
    pub fn add_contribution(&self, t: f64, conc: &[f64], wq: &mut [f64], wd: &mut [f64]) {
        let (qf, qr) = self.rates_of_progress(t, conc);
        for &(k, nu) in &self.reactants {
            wd[k] += nu * qf;
            wq[k] += nu * qr;
        }
        for &(k, nu) in &self.products {
            wq[k] += nu * qf;
            wd[k] += nu * qr;
        }
    }
}
