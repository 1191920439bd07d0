//! Imposed strain rate `a(t)` and its time derivative, consumed as forcing
//! by both point reaction systems.
use enum_dispatch::enum_dispatch;
use std::f64::consts::PI;

#[enum_dispatch]
pub trait StrainRate {
    /// strain rate, 1/s
    fn a(&self, t: f64) -> f64;
    /// time derivative of the strain rate, 1/s²
    fn dadt(&self, t: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantStrain {
    pub a0: f64,
}

impl StrainRate for ConstantStrain {
    fn a(&self, _t: f64) -> f64 {
        self.a0
    }
    fn dadt(&self, _t: f64) -> f64 {
        0.0
    }
}

/// linear ramp from `a0` to `a1` over `[t0, t0 + dt]`, constant outside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearStrain {
    pub a0: f64,
    pub a1: f64,
    pub t0: f64,
    pub dt: f64,
}

impl StrainRate for LinearStrain {
    fn a(&self, t: f64) -> f64 {
        if t <= self.t0 {
            self.a0
        } else if t >= self.t0 + self.dt {
            self.a1
        } else {
            self.a0 + (self.a1 - self.a0) * (t - self.t0) / self.dt
        }
    }
    fn dadt(&self, t: f64) -> f64 {
        if t <= self.t0 || t >= self.t0 + self.dt {
            0.0
        } else {
            (self.a1 - self.a0) / self.dt
        }
    }
}

/// `a = a_mean + amplitude * sin(2π f t)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatingStrain {
    pub a_mean: f64,
    pub amplitude: f64,
    pub frequency: f64,
}

impl StrainRate for OscillatingStrain {
    fn a(&self, t: f64) -> f64 {
        self.a_mean + self.amplitude * (2.0 * PI * self.frequency * t).sin()
    }
    fn dadt(&self, t: f64) -> f64 {
        2.0 * PI * self.frequency * self.amplitude * (2.0 * PI * self.frequency * t).cos()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[enum_dispatch(StrainRate)]
pub enum StrainFunction {
    Constant(ConstantStrain),
    Linear(LinearStrain),
    Oscillating(OscillatingStrain),
}

impl StrainFunction {
    pub fn constant(a0: f64) -> Self {
        StrainFunction::Constant(ConstantStrain { a0 })
    }
    /// a zero-length ramp is a step to `a1` at `t0`
    pub fn new(a0: f64, a1: f64, t0: f64, dt: f64) -> Self {
        StrainFunction::Linear(LinearStrain { a0, a1, t0, dt })
    }
    pub fn oscillating(a_mean: f64, amplitude: f64, frequency: f64) -> Self {
        StrainFunction::Oscillating(OscillatingStrain {
            a_mean,
            amplitude,
            frequency,
        })
    }
}

impl Default for StrainFunction {
    fn default() -> Self {
        StrainFunction::constant(0.0)
    }
}
