use super::band_matrix::BandMatrix;
use crate::errors::SplitError;
use nalgebra::DVector;

/// Relative slack used to decide that the next step reaches the end time
pub const TIME_EPS: f64 = 1e-10;

/// ODE defined as `ydot = f(t, y)`
pub trait Ode {
    fn f(&mut self, t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), SplitError>;
}

/// ODE that is locally linear: `ydot = A y + c`
pub trait LinearOde {
    /// fills the (zeroed) band matrix `a`
    fn get_a(&mut self, t: f64, a: &mut BandMatrix) -> Result<(), SplitError>;
    fn get_c(&mut self, t: f64, c: &mut DVector<f64>) -> Result<(), SplitError>;
    fn resize(&mut self, _n: usize) {}
    fn initialize(&mut self) {}
}

/// Common interface of the fixed-step integrators.
///
/// Required call order: `set_y0`, `initialize`, then any number of `step` /
/// `integrate_to_time`.
pub trait Integrator {
    fn set_y0(&mut self, y0: &DVector<f64>) -> Result<(), SplitError>;
    fn initialize(&mut self, t0: f64, h: f64) -> Result<(), SplitError>;
    fn get_t(&self) -> f64;
    fn get_h(&self) -> f64;
    fn get_y(&self) -> &DVector<f64>;
    /// time derivative at the current `(t, y)`
    fn get_ydot(&mut self) -> Result<&DVector<f64>, SplitError>;
    /// advances by exactly one step of size `h`
    fn step(&mut self) -> Result<(), SplitError>;
    fn integrate_to_time(&mut self, t_end: f64) -> Result<(), SplitError>;
}

/// state shared by all integrators
#[derive(Debug, Clone)]
pub struct IntegratorState {
    /// solution vector
    pub y: DVector<f64>,
    /// time derivative of the solution vector
    pub ydot: DVector<f64>,
    pub t: f64,
    pub h: f64,
    pub N: usize,
    pub y0_set: bool,
    pub initialized: bool,
}

impl IntegratorState {
    pub fn new(n: usize) -> Self {
        Self {
            y: DVector::zeros(n),
            ydot: DVector::zeros(n),
            t: 0.0,
            h: 0.0,
            N: n,
            y0_set: false,
            initialized: false,
        }
    }

    pub fn set_y0(&mut self, y0: &DVector<f64>) {
        self.N = y0.len();
        self.y = y0.clone();
        self.ydot = DVector::zeros(self.N);
        self.y0_set = true;
        self.initialized = false;
    }

    pub fn initialize(&mut self, t0: f64, h: f64) -> Result<(), SplitError> {
        if !self.y0_set {
            return Err(SplitError::NotInitialized(
                "set_y0 must be called before initialize".to_string(),
            ));
        }
        if !(h > 0.0) || !h.is_finite() {
            return Err(SplitError::InvalidStepSize(h));
        }
        self.t = t0;
        self.h = h;
        self.initialized = true;
        Ok(())
    }

    pub fn require_initialized(&self) -> Result<(), SplitError> {
        if !self.initialized {
            return Err(SplitError::NotInitialized(
                "set_y0 and initialize must be called before stepping".to_string(),
            ));
        }
        Ok(())
    }

    /// integration never runs backwards in time
    pub fn check_end_time(&self, t_end: f64) -> Result<(), SplitError> {
        if !(t_end >= self.t - TIME_EPS * self.h) {
            return Err(SplitError::TimeOrder { t: self.t, t_end });
        }
        Ok(())
    }

    /// Size of the next step on the way to `t_end`, `None` when `t_end` is
    /// reached. A step that would overshoot, or leave a remainder within
    /// `TIME_EPS * h`, is shortened to land exactly on `t_end`.
    pub fn next_step_size(&self, t_end: f64) -> Option<(f64, bool)> {
        let remaining = t_end - self.t;
        if remaining <= TIME_EPS * self.h {
            return None;
        }
        if remaining <= self.h * (1.0 + TIME_EPS) {
            Some((remaining, true))
        } else {
            Some((self.h, false))
        }
    }
}
