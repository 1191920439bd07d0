use super::chemistry_api::GAS_CONSTANT;
use serde::{Deserialize, Serialize};

fn cp_over_r(t: f64, a: &[f64; 7]) -> f64 {
    a[0] + a[1] * t + a[2] * t.powi(2) + a[3] * t.powi(3) + a[4] * t.powi(4)
}
fn h_over_rt(t: f64, a: &[f64; 7]) -> f64 {
    a[0] + a[1] * t / 2.0
        + a[2] * t.powi(2) / 3.0
        + a[3] * t.powi(3) / 4.0
        + a[4] * t.powi(4) / 5.0
        + a[5] / t
}

/// NASA format 7 coefficients in two temperature ranges.
///
/// `cp/R = a0 + a1 T + a2 T² + a3 T³ + a4 T⁴`,
/// `h/(RT) = a0 + a1 T/2 + a2 T²/3 + a3 T³/4 + a4 T⁴/5 + a5/T`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nasa7 {
    /// switching temperature between the two ranges (K)
    pub t_mid: f64,
    /// coefficients for T < t_mid
    pub low: [f64; 7],
    /// coefficients for T >= t_mid
    pub high: [f64; 7],
}

impl Nasa7 {
    pub fn new(t_mid: f64, low: [f64; 7], high: [f64; 7]) -> Self {
        Self { t_mid, low, high }
    }
    /// constant heat capacity `cp = cp_r * R` and enthalpy of formation `h0`
    /// (J/kmol) at 0 K
    pub fn constant_cp(cp_r: f64, h0: f64) -> Self {
        let a = [cp_r, 0.0, 0.0, 0.0, 0.0, h0 / GAS_CONSTANT, 0.0];
        Self {
            t_mid: 1000.0,
            low: a,
            high: a,
        }
    }
    fn coeffs(&self, t: f64) -> &[f64; 7] {
        if t < self.t_mid { &self.low } else { &self.high }
    }
    /// molar heat capacity, J/(kmol·K)
    pub fn cp(&self, t: f64) -> f64 {
        GAS_CONSTANT * cp_over_r(t, self.coeffs(t))
    }
    /// molar enthalpy, J/kmol
    pub fn enthalpy(&self, t: f64) -> f64 {
        GAS_CONSTANT * t * h_over_rt(t, self.coeffs(t))
    }
}
