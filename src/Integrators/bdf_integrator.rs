//! # Implicit fixed-step integrator for locally linear systems
//!
//! Advances `ydot = A y + c`. The first step after `set_y0` / `initialize`
//! is backward Euler, every following step of the same size is BDF2:
//!
//! ```text
//! step 1:  (I - h A) y_1 = y_0 + h c
//! step n:  (I - 2/3 h A) y_{n+1} = 4/3 y_n - 1/3 y_{n-1} + 2/3 h c
//! ```
//!
//! A step whose size differs from the previous one restarts with backward
//! Euler.
//!
//! `A` (banded) and `c` are requested from the [`LinearOde`] on the first
//! step and then held fixed. Both factorizations (`I - h A` and
//! `I - 2/3 h A`) are cached and rebuilt only when `A` was refreshed or the
//! step size differs from the one they were built for (the shortened last
//! step of `integrate_to_time`).
use super::band_matrix::BandMatrix;
use super::integrator::{Integrator, IntegratorState, LinearOde, TIME_EPS};
use crate::errors::{SplitError, check_len};
use log::debug;
use nalgebra::DVector;

pub struct BdfIntegrator<'a, L: LinearOde> {
    ode: &'a mut L,
    state: IntegratorState,
    /// linear operator as returned by the ODE
    A: BandMatrix,
    /// factorized `I - h A`
    LU: BandMatrix,
    pivots: Vec<usize>,
    /// factorized `I - 2/3 h A`
    LU2: BandMatrix,
    pivots2: Vec<usize>,
    /// steps taken since `set_y0` / `initialize`
    step_count: usize,
    upper_bw: usize,
    lower_bw: usize,
    /// state before the last step
    yprev: DVector<f64>,
    c: DVector<f64>,
    Adiag: DVector<f64>,
    /// step sizes the cached factorizations correspond to
    lu_h: Option<f64>,
    lu2_h: Option<f64>,
    /// size of the last step taken
    h_prev: Option<f64>,
    sized: bool,
}

impl<'a, L: LinearOde> BdfIntegrator<'a, L> {
    pub fn new(ode: &'a mut L) -> Self {
        Self {
            ode,
            state: IntegratorState::new(0),
            A: BandMatrix::new(0, 0, 0),
            LU: BandMatrix::new(0, 0, 0),
            pivots: Vec::new(),
            LU2: BandMatrix::new(0, 0, 0),
            pivots2: Vec::new(),
            step_count: 0,
            upper_bw: 0,
            lower_bw: 0,
            yprev: DVector::zeros(0),
            c: DVector::zeros(0),
            Adiag: DVector::zeros(0),
            lu_h: None,
            lu2_h: None,
            h_prev: None,
            sized: false,
        }
    }

    /// Allocates the system for `n` unknowns with the given bandwidths.
    /// Everything computed before is discarded.
    pub fn resize(&mut self, n: usize, upper_bw: usize, lower_bw: usize) {
        self.upper_bw = upper_bw.min(n.saturating_sub(1));
        self.lower_bw = lower_bw.min(n.saturating_sub(1));
        self.A = BandMatrix::new(n, self.upper_bw, self.lower_bw);
        self.LU = BandMatrix::new(n, self.upper_bw, self.lower_bw);
        self.pivots = vec![0; n];
        self.LU2 = BandMatrix::new(n, self.upper_bw, self.lower_bw);
        self.pivots2 = vec![0; n];
        self.yprev = DVector::zeros(n);
        self.c = DVector::zeros(n);
        self.Adiag = DVector::zeros(n);
        self.state = IntegratorState::new(n);
        self.restart();
        self.sized = true;
        self.ode.resize(n);
    }

    pub fn ode(&self) -> &L {
        &*self.ode
    }

    pub fn ode_mut(&mut self) -> &mut L {
        &mut *self.ode
    }

    /// diagonal of the most recently queried `A`
    pub fn get_diagonal(&self) -> &DVector<f64> {
        &self.Adiag
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn previous_y(&self) -> &DVector<f64> {
        &self.yprev
    }

    /// next step is a backward Euler step with a fresh operator
    fn restart(&mut self) {
        self.step_count = 0;
        self.lu_h = None;
        self.lu2_h = None;
        self.h_prev = None;
    }

    fn refresh_operator(&mut self) -> Result<(), SplitError> {
        let t = self.state.t;
        self.A.fill_zero();
        self.ode.get_a(t, &mut self.A)?;
        self.c.fill(0.0);
        self.ode.get_c(t, &mut self.c)?;
        check_len("BdfIntegrator (c)", self.state.N, self.c.len())?;
        self.Adiag = self.A.diagonal();
        self.lu_h = None;
        self.lu2_h = None;
        Ok(())
    }

    fn step_with(&mut self, h: f64) -> Result<(), SplitError> {
        if self.step_count == 0 {
            self.refresh_operator()?;
        }
        let bdf2 = match self.h_prev {
            Some(hp) => self.step_count > 0 && (h - hp).abs() <= TIME_EPS * hp,
            None => false,
        };
        let mut rhs;
        if bdf2 {
            if self.lu2_h != Some(h) {
                self.LU2 = self.A.identity_minus_scaled(2.0 / 3.0 * h);
                self.lu2_h = None;
                self.LU2.factorize(&mut self.pivots2)?;
                self.lu2_h = Some(h);
            }
            rhs = &self.state.y * (4.0 / 3.0);
            rhs.axpy(-1.0 / 3.0, &self.yprev, 1.0);
            rhs.axpy(2.0 / 3.0 * h, &self.c, 1.0);
            self.LU2.solve(&self.pivots2, &mut rhs);
        } else {
            if self.lu_h != Some(h) {
                self.LU = self.A.identity_minus_scaled(h);
                // a failed factorization must not be mistaken for a cached one
                self.lu_h = None;
                self.LU.factorize(&mut self.pivots)?;
                self.lu_h = Some(h);
            }
            rhs = self.state.y.clone();
            rhs.axpy(h, &self.c, 1.0);
            self.LU.solve(&self.pivots, &mut rhs);
        }
        self.yprev = std::mem::replace(&mut self.state.y, rhs);
        self.state.t += h;
        self.h_prev = Some(h);
        self.step_count += 1;
        Ok(())
    }
}

impl<'a, L: LinearOde> Integrator for BdfIntegrator<'a, L> {
    fn set_y0(&mut self, y0: &DVector<f64>) -> Result<(), SplitError> {
        if !self.sized {
            return Err(SplitError::NotInitialized(
                "BdfIntegrator::resize must be called before set_y0".to_string(),
            ));
        }
        check_len("BdfIntegrator::set_y0", self.A.n(), y0.len())?;
        self.state.set_y0(y0);
        self.restart();
        Ok(())
    }

    fn initialize(&mut self, t0: f64, h: f64) -> Result<(), SplitError> {
        self.state.initialize(t0, h)?;
        self.restart();
        self.ode.initialize();
        Ok(())
    }

    fn get_t(&self) -> f64 {
        self.state.t
    }

    fn get_h(&self) -> f64 {
        self.state.h
    }

    fn get_y(&self) -> &DVector<f64> {
        &self.state.y
    }

    fn get_ydot(&mut self) -> Result<&DVector<f64>, SplitError> {
        self.state.require_initialized()?;
        if self.step_count == 0 {
            self.refresh_operator()?;
        }
        let mut ydot = DVector::zeros(self.state.N);
        self.A.mul_vec(&self.state.y, &mut ydot);
        ydot += &self.c;
        self.state.ydot = ydot;
        Ok(&self.state.ydot)
    }

    fn step(&mut self) -> Result<(), SplitError> {
        self.state.require_initialized()?;
        let h = self.state.h;
        self.step_with(h)
    }

    fn integrate_to_time(&mut self, t_end: f64) -> Result<(), SplitError> {
        self.state.require_initialized()?;
        self.state.check_end_time(t_end)?;
        let n0 = self.step_count;
        while let Some((h, last)) = self.state.next_step_size(t_end) {
            self.step_with(h)?;
            if last {
                break;
            }
        }
        self.state.t = t_end;
        debug!(
            "implicit integration reached t = {:e} in {} steps",
            t_end,
            self.step_count - n0
        );
        Ok(())
    }
}
