//! # Quasi-steady-state predictor-corrector stepper
//!
//! Integrates systems written as `dy/dt = q(y) - d(y)` with `q` a production
//! and `d` a destruction term (CHEMEQ2 family of schemes). With the
//! characteristic time `tau = y / d` and `r = dt / tau` each component is
//! advanced with the asymptotic form
//!
//! ```text
//! predictor:  y1 = y0 + dt (q0 - d0) / (1 + alpha(r0) r0)
//! corrector:  rb = (r0 + r1) / 2
//!             q~ = (1 - alpha(rb)) q0 + alpha(rb) q1
//!             y1 = y0 + dt (q~ - rb/dt y0) / (1 + alpha(rb) rb)
//! alpha(r) = (180 + 60r + 11r² + r³) / (360 + 60r + 12r² + r³)
//! ```
//!
//! which goes to the explicit limit for slow components and to the
//! quasi-steady value `q/d` for fast ones.
//!
//! ## Step control
//! The normalized error `eps = max_i |y1 - y_prev| / (epsmin |y1|)` compares
//! the final corrector with the previous iterate. A step is accepted when
//! `eps <= epsmax`, and the next step is `dt (1/sqrt(eps) + 0.005)`, bounded
//! by `dtmin` and `dtmax`; a rejected step at least halves `dt`. A rejected
//! step at `dtmin` is a failure.
use crate::errors::{SplitError, check_len};
use crate::settings::ConfigOptions;
use log::warn;
use nalgebra::DVector;

/// numerator factor of the initial step estimate
const INITIAL_STEP_FACTOR: f64 = 0.5;
/// floor of the normalized error
const MIN_EPS: f64 = 1e-10;
/// largest step ratio after a rejected step
const REJECT_SHRINK: f64 = 0.5;

/// Right-hand side split into production and destruction terms. The
/// predictor evaluation is always made at an accepted state, the corrector
/// evaluations at the predictor's estimate.
pub trait QssOde<G: ?Sized> {
    fn predict(
        &mut self,
        gas: &mut G,
        t: f64,
        y: &DVector<f64>,
        q: &mut DVector<f64>,
        d: &mut DVector<f64>,
    ) -> Result<(), SplitError>;
    fn correct(
        &mut self,
        gas: &mut G,
        t: f64,
        y: &DVector<f64>,
        q: &mut DVector<f64>,
        d: &mut DVector<f64>,
    ) -> Result<(), SplitError>;
}

/// Padé approximation used for the asymptotic weighting
pub fn pade_alpha(r: f64) -> f64 {
    let r2 = r * r;
    let r3 = r2 * r;
    (180.0 + 60.0 * r + 11.0 * r2 + r3) / (360.0 + 60.0 * r + 12.0 * r2 + r3)
}

#[derive(Debug, Clone)]
pub struct QssIntegrator {
    N: usize,
    /// current solution
    pub y: DVector<f64>,
    pub q: DVector<f64>,
    pub d: DVector<f64>,
    /// lower bounds, applied where `enforce_ymin` is set
    pub ymin: DVector<f64>,
    pub enforce_ymin: Vec<bool>,
    pub epsmin: f64,
    pub epsmax: f64,
    pub dtmin: f64,
    pub dtmax: f64,
    /// corrector iterations per step
    pub itermax: usize,
    /// components smaller than this do not enter the error estimate
    pub abstol: f64,
    pub stability_check: bool,
    /// current time
    pub tn: f64,
    /// next step size
    pub dt: f64,
    /// start time of the current step
    ts: f64,
    /// right-hand side evaluations since `set_state`
    pub gcount: usize,
    /// rejected steps since `set_state`
    pub rcount: usize,
    first_step: bool,
    rates_current: bool,
    y0: DVector<f64>,
    y1: DVector<f64>,
    ym: DVector<f64>,
    q0: DVector<f64>,
    d0: DVector<f64>,
    rtau0: DVector<f64>,
    /// increments of the last accepted step, for the stability check
    dy_prev: Option<DVector<f64>>,
}

impl Default for QssIntegrator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl QssIntegrator {
    pub fn new(n: usize) -> Self {
        let options = ConfigOptions::default();
        let mut integ = Self {
            N: 0,
            y: DVector::zeros(0),
            q: DVector::zeros(0),
            d: DVector::zeros(0),
            ymin: DVector::zeros(0),
            enforce_ymin: Vec::new(),
            epsmin: 0.0,
            epsmax: 0.0,
            dtmin: 0.0,
            dtmax: 0.0,
            itermax: 1,
            abstol: 0.0,
            stability_check: false,
            tn: 0.0,
            dt: 0.0,
            ts: 0.0,
            gcount: 0,
            rcount: 0,
            first_step: true,
            rates_current: false,
            y0: DVector::zeros(0),
            y1: DVector::zeros(0),
            ym: DVector::zeros(0),
            q0: DVector::zeros(0),
            d0: DVector::zeros(0),
            rtau0: DVector::zeros(0),
            dy_prev: None,
        };
        integ.set_options(&options);
        integ.resize(n);
        integ
    }

    pub fn n(&self) -> usize {
        self.N
    }

    /// reallocates the per-component arrays; bounds are cleared
    pub fn resize(&mut self, n: usize) {
        self.N = n;
        self.y = DVector::zeros(n);
        self.q = DVector::zeros(n);
        self.d = DVector::zeros(n);
        self.ymin = DVector::zeros(n);
        self.enforce_ymin = vec![false; n];
        self.y0 = DVector::zeros(n);
        self.y1 = DVector::zeros(n);
        self.ym = DVector::zeros(n);
        self.q0 = DVector::zeros(n);
        self.d0 = DVector::zeros(n);
        self.rtau0 = DVector::zeros(n);
        self.dy_prev = None;
        self.first_step = true;
        self.rates_current = false;
    }

    /// copies the step control settings
    pub fn set_options(&mut self, options: &ConfigOptions) {
        self.epsmin = options.qss_eps_min;
        self.epsmax = options.qss_eps_max;
        self.dtmin = options.qss_dt_min;
        self.dtmax = options.qss_dt_max;
        self.itermax = options.qss_iteration_count.max(1);
        self.abstol = options.qss_abs_tol;
        self.stability_check = options.qss_stability_check;
    }

    /// installs the initial state; the first step size is estimated again
    pub fn set_state(&mut self, y: &DVector<f64>, t_start: f64) -> Result<(), SplitError> {
        check_len("QssIntegrator::set_state", self.N, y.len())?;
        self.y.copy_from(y);
        self.tn = t_start;
        self.ts = t_start;
        self.gcount = 0;
        self.rcount = 0;
        self.first_step = true;
        self.rates_current = false;
        self.dy_prev = None;
        Ok(())
    }

    fn enforce_bounds(&self, y: &mut DVector<f64>) {
        for i in 0..self.N {
            if self.enforce_ymin[i] && y[i] < self.ymin[i] {
                y[i] = self.ymin[i];
            }
        }
    }

    /// destruction frequency times `dt`; zero where it is undefined
    fn rtau(dt: f64, d: f64, y: f64) -> f64 {
        if y != 0.0 { (dt * d / y).max(0.0) } else { 0.0 }
    }

    fn estimate_initial_step(&self) -> f64 {
        let mut scrtch: f64 = 1e-25;
        for i in 0..self.N {
            if self.y[i] == 0.0 {
                continue;
            }
            let ascr = self.q[i].abs();
            let scr2 = (1.0 / self.y[i]).copysign(0.1 * self.epsmin * ascr - self.d[i]);
            let scr1 = scr2 * self.d[i];
            scrtch = scrtch.max(scr1).max(-(ascr - self.d[i]).abs() * scr2);
        }
        (INITIAL_STEP_FACTOR * self.epsmin / scrtch)
            .min(self.dtmax)
            .max(self.dtmin)
    }

    /// Advances the installed state to `tf`.
    pub fn integrate_to_time<G: ?Sized, O: QssOde<G>>(
        &mut self,
        ode: &mut O,
        gas: &mut G,
        tf: f64,
    ) -> Result<(), SplitError> {
        while self.tn < tf {
            if !self.rates_current {
                ode.predict(gas, self.tn, &self.y, &mut self.q, &mut self.d)?;
                self.gcount += 1;
                self.rates_current = true;
            }
            if self.first_step {
                self.dt = self.estimate_initial_step();
                self.first_step = false;
            }
            let remaining = tf - self.tn;
            let last = self.dt >= remaining;
            let dt = if last { remaining } else { self.dt };
            self.step(ode, gas, dt, last, tf)?;
        }
        Ok(())
    }

    fn step<G: ?Sized, O: QssOde<G>>(
        &mut self,
        ode: &mut O,
        gas: &mut G,
        dt: f64,
        last: bool,
        tf: f64,
    ) -> Result<(), SplitError> {
        self.ts = self.tn;
        self.y0.copy_from(&self.y);
        self.q0.copy_from(&self.q);
        self.d0.copy_from(&self.d);

        // predictor
        for i in 0..self.N {
            let r = Self::rtau(dt, self.d0[i], self.y0[i]);
            self.rtau0[i] = r;
            self.y1[i] = self.y0[i] + dt * (self.q0[i] - self.d0[i]) / (1.0 + pade_alpha(r) * r);
        }
        let mut y1 = std::mem::take(&mut self.y1);
        self.enforce_bounds(&mut y1);
        self.y1 = y1;
        let t_new = self.ts + dt;

        // corrector iterations
        for _ in 0..self.itermax {
            self.ym.copy_from(&self.y1);
            ode.correct(gas, t_new, &self.y1, &mut self.q, &mut self.d)?;
            self.gcount += 1;
            for i in 0..self.N {
                let r1 = Self::rtau(dt, self.d[i], self.y1[i]);
                let rb = 0.5 * (self.rtau0[i] + r1);
                let alpha = pade_alpha(rb);
                let q_tilde = (1.0 - alpha) * self.q0[i] + alpha * self.q[i];
                let destruction = if rb > 0.0 {
                    rb / dt * self.y0[i]
                } else {
                    0.5 * (self.d0[i] + self.d[i])
                };
                self.y1[i] = self.y0[i] + dt * (q_tilde - destruction) / (1.0 + alpha * rb);
            }
            let mut y1 = std::mem::take(&mut self.y1);
            self.enforce_bounds(&mut y1);
            self.y1 = y1;
        }

        let mut eps = MIN_EPS;
        for i in 0..self.N {
            let scale = self.y1[i].abs();
            if scale > self.abstol {
                eps = eps.max((self.y1[i] - self.ym[i]).abs() / scale);
            }
        }
        let eps = eps / self.epsmin;
        let mut dt_new = dt * (1.0 / eps.sqrt() + 0.005);

        if eps <= self.epsmax {
            if self.stability_check && self.oscillates() {
                dt_new = dt_new.min(dt);
            }
            self.dy_prev = Some(&self.y1 - &self.y0);
            self.y.copy_from(&self.y1);
            self.tn = if last { tf } else { t_new };
            // rates at the new state are needed by the next predictor
            self.rates_current = false;
        } else {
            self.rcount += 1;
            if dt <= self.dtmin {
                warn!(
                    "QSS step rejected at the minimum step size: t = {:e}, dt = {:e}, eps = {:e}",
                    self.ts, dt, eps
                );
                self.restore_start();
                return Err(SplitError::QssStepFailure { t: self.ts, dt });
            }
            self.restore_start();
            dt_new = dt_new.min(REJECT_SHRINK * dt);
        }
        self.dt = dt_new.min(self.dtmax).max(self.dtmin);
        Ok(())
    }

    fn restore_start(&mut self) {
        self.tn = self.ts;
        self.y.copy_from(&self.y0);
        self.q.copy_from(&self.q0);
        self.d.copy_from(&self.d0);
        self.rates_current = true;
    }

    /// true if a significant component reversed direction since the last
    /// accepted step
    fn oscillates(&self) -> bool {
        let Some(dy_prev) = &self.dy_prev else {
            return false;
        };
        (0..self.N).any(|i| {
            let dy = self.y1[i] - self.y0[i];
            let scale = self.y1[i].abs();
            scale > self.abstol && dy * dy_prev[i] < 0.0 && dy.abs() > self.epsmin * scale
        })
    }
}
