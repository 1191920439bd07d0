//! Linearized reaction sub-step.
//!
//! Freezes the point reaction system around the state `y0` at the start of
//! the sub-step:
//!
//! ```text
//! ydot ≈ J(y0) y + (f(y0) - J(y0) y0)
//! ```
//!
//! so that it can be advanced by the implicit banded stepper. The
//! Jacobian is a full band (`ku = kl = nVars - 1`).
use super::source_system::SourceSystem;
use crate::Chemistry::chemistry_api::ChemistryProvider;
use crate::Integrators::band_matrix::BandMatrix;
use crate::Integrators::integrator::LinearOde;
use crate::errors::{SplitError, check_len};
use nalgebra::{DMatrix, DVector};

pub struct LinearizedSource<'a, G: ChemistryProvider> {
    system: &'a mut SourceSystem,
    gas: &'a mut G,
    y0: DVector<f64>,
    /// difference the whole right-hand side instead of the chain rule
    pub use_fd: bool,
    jac: DMatrix<f64>,
    f0: DVector<f64>,
    /// `t` of the cached linearization
    linearized_at: Option<f64>,
}

impl<'a, G: ChemistryProvider> LinearizedSource<'a, G> {
    pub fn new(system: &'a mut SourceSystem, gas: &'a mut G, y0: &DVector<f64>, use_fd: bool) -> Self {
        Self {
            system,
            gas,
            y0: y0.clone(),
            use_fd,
            jac: DMatrix::zeros(0, 0),
            f0: DVector::zeros(0),
            linearized_at: None,
        }
    }

    /// full bandwidth for the stepper's `resize`
    pub fn bandwidth(&self) -> usize {
        self.system.n_vars().saturating_sub(1)
    }

    pub fn system(&self) -> &SourceSystem {
        &*self.system
    }

    /// new linearization point, e.g. for the next cycle
    pub fn set_y0(&mut self, y0: &DVector<f64>) {
        self.y0.copy_from(y0);
        self.linearized_at = None;
    }

    fn linearize(&mut self, t: f64) -> Result<(), SplitError> {
        if self.linearized_at == Some(t) {
            return Ok(());
        }
        let n_vars = self.system.n_vars();
        check_len("LinearizedSource (y0)", n_vars, self.y0.len())?;
        let mut f0 = DVector::zeros(n_vars);
        self.system.f(&mut *self.gas, t, &self.y0, &mut f0)?;
        let mut jac = DMatrix::zeros(n_vars, n_vars);
        if self.use_fd {
            self.system.fd_jacobian(&mut *self.gas, t, &self.y0, &f0, &mut jac)?;
        } else {
            self.system.dense_jacobian(&mut *self.gas, t, &self.y0, &mut jac)?;
        }
        self.jac = jac;
        self.f0 = f0;
        self.linearized_at = Some(t);
        Ok(())
    }
}

impl<'a, G: ChemistryProvider> LinearOde for LinearizedSource<'a, G> {
    fn get_a(&mut self, t: f64, a: &mut BandMatrix) -> Result<(), SplitError> {
        self.linearize(t)?;
        check_len("LinearizedSource::get_a", self.jac.nrows(), a.n())?;
        for i in 0..a.n() {
            for j in 0..a.n() {
                if a.in_band(i, j) {
                    a.set(i, j, self.jac[(i, j)]);
                }
            }
        }
        Ok(())
    }

    fn get_c(&mut self, t: f64, c: &mut DVector<f64>) -> Result<(), SplitError> {
        self.linearize(t)?;
        check_len("LinearizedSource::get_c", self.f0.len(), c.len())?;
        let jy = &self.jac * &self.y0;
        c.copy_from(&(&self.f0 - jy));
        Ok(())
    }

    fn initialize(&mut self) {
        self.linearized_at = None;
    }
}
