//! # Point reaction system, quasi-steady-state form
//!
//! Same physics as [`super::source_system::SourceSystem`], written as
//! production `Q` and destruction `D` terms for the [`QssIntegrator`]:
//!
//! | variable | `Q` | `D` |
//! |----------|-----|-----|
//! | `U` | `rhou/rho (dadt + a²)` | `U²` |
//! | `T` | `qDot / (rho cp)` | `0` |
//! | `Y_k` | `wDotQ_k W_k / rho` | `wDotD_k W_k / rho` |
//!
//! A split constant `c` enters `Q` when positive and `D` (as `-c`) when
//! negative, so that `Q - D` always carries the full constant while both
//! terms stay non-negative for the species. The linear split term
//! `splitLinear[i] y_i` is distributed the same way, so a decaying
//! coefficient acts as a destruction rate proportional to the variable.
//!
//! ## Evaluation phases
//! `predict` evaluates at an accepted state and refreshes the thermodynamic
//! properties. `correct` evaluates at the predictor's estimate, clamps the
//! mass fractions to zero from below and reuses `rho`, `cp` and `hk` from the
//! predictor. Calling `correct` first is an error.
use super::qss_integrator::{QssIntegrator, QssOde};
use super::source_system::roll_point;
use crate::Chemistry::chemistry_api::ChemistryProvider;
use crate::errors::{SplitError, check_len};
use crate::settings::ConfigOptions;
use crate::strain_function::{StrainFunction, StrainRate};
use log::debug;
use nalgebra::DVector;
use prettytable::{Cell, Row, Table};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QssPhase {
    Idle,
    Predicted,
    Corrected,
}

#[derive(Debug, Clone)]
pub struct SourceSystemQss {
    pub U: f64,
    pub dUdtQ: f64,
    pub dUdtD: f64,
    pub T: f64,
    pub dTdtQ: f64,
    pub dTdtD: f64,
    pub Y: DVector<f64>,
    pub dYdtQ: DVector<f64>,
    pub dYdtD: DVector<f64>,
    pub strain_function: StrainFunction,
    /// grid index of this system
    pub j: usize,
    /// grid position of this system
    pub x: f64,
    /// species molecular weights [kg/kmol]
    pub W: DVector<f64>,
    /// density of the unburned mixture
    pub rhou: f64,
    pub split_const_U: f64,
    pub split_const_T: f64,
    pub split_const_Y: DVector<f64>,
    /// per-variable linear coefficients introduced by splitting, `[U, T, Y..]`
    pub split_linear: DVector<f64>,
    /// creation and destruction rates [kmol/m^3/s]
    pub wdot_q: DVector<f64>,
    pub wdot_d: DVector<f64>,
    /// heat release rate [W/m^3]
    pub qdot: f64,
    n_spec: usize,
    rho: f64,
    cp: f64,
    cp_spec: DVector<f64>,
    Wmx: f64,
    hk: DVector<f64>,
    phase: QssPhase,
    split_consts_ready: bool,
    initialized: bool,
    options_set: bool,
    min_val: f64,
    integrator: QssIntegrator,
}

impl Default for SourceSystemQss {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceSystemQss {
    /// An empty system; `initialize` and `set_options` must follow.
    pub fn new() -> Self {
        Self {
            U: 0.0,
            dUdtQ: 0.0,
            dUdtD: 0.0,
            T: 0.0,
            dTdtQ: 0.0,
            dTdtD: 0.0,
            Y: DVector::zeros(0),
            dYdtQ: DVector::zeros(0),
            dYdtD: DVector::zeros(0),
            strain_function: StrainFunction::default(),
            j: 0,
            x: 0.0,
            W: DVector::zeros(0),
            rhou: 0.0,
            split_const_U: 0.0,
            split_const_T: 0.0,
            split_const_Y: DVector::zeros(0),
            split_linear: DVector::zeros(0),
            wdot_q: DVector::zeros(0),
            wdot_d: DVector::zeros(0),
            qdot: 0.0,
            n_spec: 0,
            rho: 0.0,
            cp: 0.0,
            cp_spec: DVector::zeros(0),
            Wmx: 0.0,
            hk: DVector::zeros(0),
            phase: QssPhase::Idle,
            split_consts_ready: false,
            initialized: false,
            options_set: false,
            min_val: 0.0,
            integrator: QssIntegrator::default(),
        }
    }

    /// initialized for the provider's species, with its molecular weights
    pub fn for_provider<G: ChemistryProvider>(gas: &G, options: &ConfigOptions) -> Self {
        let mut system = Self::new();
        system.initialize(gas.n_species());
        system.W.copy_from_slice(gas.molecular_weights());
        system.set_options(options);
        system
    }

    /// Sizes every per-species array and the stepper for `n_spec` species.
    pub fn initialize(&mut self, n_spec: usize) {
        self.n_spec = n_spec;
        self.Y = DVector::zeros(n_spec);
        self.dYdtQ = DVector::zeros(n_spec);
        self.dYdtD = DVector::zeros(n_spec);
        self.W = DVector::zeros(n_spec);
        self.split_const_Y = DVector::zeros(n_spec);
        self.split_linear = DVector::zeros(n_spec + 2);
        self.wdot_q = DVector::zeros(n_spec);
        self.wdot_d = DVector::zeros(n_spec);
        self.cp_spec = DVector::zeros(n_spec);
        self.hk = DVector::zeros(n_spec);
        self.integrator.resize(n_spec + 2);
        self.apply_species_bounds();
        self.phase = QssPhase::Idle;
        self.split_consts_ready = false;
        self.initialized = true;
    }

    /// step control of the stepper and the lower bound of the mass fractions
    pub fn set_options(&mut self, options: &ConfigOptions) {
        self.integrator.set_options(options);
        self.min_val = options.qss_min_val;
        self.options_set = true;
        self.apply_species_bounds();
    }

    fn apply_species_bounds(&mut self) {
        for k in 0..self.n_spec {
            self.integrator.enforce_ymin[2 + k] = true;
            self.integrator.ymin[2 + k] = self.min_val;
        }
    }

    pub fn n_spec(&self) -> usize {
        self.n_spec
    }
    pub fn n_vars(&self) -> usize {
        self.n_spec + 2
    }
    pub fn phase(&self) -> QssPhase {
        self.phase
    }
    pub fn integrator(&self) -> &QssIntegrator {
        &self.integrator
    }
    pub fn density(&self) -> f64 {
        self.rho
    }
    pub fn mixture_molecular_weight(&self) -> f64 {
        self.Wmx
    }
    /// species molar heat capacities from the last predictor evaluation
    pub fn species_heat_capacities(&self) -> &DVector<f64> {
        &self.cp_spec
    }

    fn require_ready(&self) -> Result<(), SplitError> {
        if !self.initialized || !self.options_set {
            return Err(SplitError::NotInitialized(
                "SourceSystemQss needs initialize and set_options".to_string(),
            ));
        }
        if !self.split_consts_ready {
            return Err(SplitError::SplitConstantsNotReset);
        }
        Ok(())
    }

    pub fn reset_split_constants(&mut self) {
        self.split_const_U = 0.0;
        self.split_const_T = 0.0;
        self.split_const_Y.fill(0.0);
        self.split_linear.fill(0.0);
        self.split_consts_ready = true;
    }

    /// installs this cycle's split constants
    pub fn set_split_constants(&mut self, u: f64, t: f64, y: &DVector<f64>) -> Result<(), SplitError> {
        check_len("SourceSystemQss::set_split_constants", self.n_spec, y.len())?;
        self.split_const_U = u;
        self.split_const_T = t;
        self.split_const_Y.copy_from(y);
        self.split_consts_ready = true;
        Ok(())
    }

    /// installs the diagonal linear term, ordered `[U, T, Y..]`
    pub fn set_split_linear(&mut self, values: &DVector<f64>) -> Result<(), SplitError> {
        check_len("SourceSystemQss::set_split_linear", self.n_vars(), values.len())?;
        self.split_linear.copy_from(values);
        Ok(())
    }

    /// marks the split constants as consumed; see `SourceSystem::finish_cycle`
    pub fn finish_cycle(&mut self) {
        self.split_consts_ready = false;
    }

    fn unroll_y(&mut self, y: &DVector<f64>, corrector: bool) -> Result<(), SplitError> {
        check_len("SourceSystemQss::unroll_y", self.n_vars(), y.len())?;
        self.U = y[0];
        self.T = y[1];
        for k in 0..self.n_spec {
            self.Y[k] = if corrector { y[2 + k].max(0.0) } else { y[2 + k] };
        }
        Ok(())
    }

    pub fn roll_y(&self, y: &mut DVector<f64>) {
        roll_point(self.U, self.T, &self.Y, y);
    }

    pub fn roll_ydot(&self, q: &mut DVector<f64>, d: &mut DVector<f64>) {
        roll_point(self.dUdtQ, self.dTdtQ, &self.dYdtQ, q);
        roll_point(self.dUdtD, self.dTdtD, &self.dYdtD, d);
    }

    /// Installs the state at the start of a sub-step.
    pub fn set_state(&mut self, t_start: f64, u: f64, t: f64, y: &DVector<f64>) -> Result<(), SplitError> {
        if !self.initialized {
            return Err(SplitError::NotInitialized(
                "SourceSystemQss::initialize must precede set_state".to_string(),
            ));
        }
        check_len("SourceSystemQss::set_state", self.n_spec, y.len())?;
        self.U = u;
        self.T = t;
        self.Y.copy_from(y);
        self.phase = QssPhase::Idle;
        let mut y0 = DVector::zeros(self.n_vars());
        self.roll_y(&mut y0);
        self.integrator.set_state(&y0, t_start)
    }

    /// Integrates the installed state to `tf` and copies the result back
    /// into `U`, `T`, `Y`.
    pub fn integrate_to_time<G: ChemistryProvider>(&mut self, gas: &mut G, tf: f64) -> Result<(), SplitError> {
        self.require_ready()?;
        let mut integrator = std::mem::take(&mut self.integrator);
        let result = integrator.integrate_to_time(self, gas, tf);
        self.integrator = integrator;
        result?;
        let y = self.integrator.y.clone();
        self.unroll_y(&y, false)?;
        debug!(
            "QSS point {}: t = {:e}, {} evaluations, {} rejected steps",
            self.j, self.integrator.tn, self.integrator.gcount, self.integrator.rcount
        );
        Ok(())
    }

    fn check_provider<G: ChemistryProvider>(&self, gas: &G) -> Result<(), SplitError> {
        check_len("SourceSystemQss (provider species)", self.n_spec, gas.n_species())?;
        check_len("SourceSystemQss (molecular weights)", self.n_spec, self.W.len())
    }

    fn update_thermo<G: ChemistryProvider>(&mut self, gas: &mut G) -> Result<(), SplitError> {
        self.rho = 0.0;
        self.cp = 0.0;
        self.Wmx = 0.0;
        gas.set_state_mass(self.Y.as_slice(), self.T)?;
        self.rho = gas.density();
        self.cp = gas.cp_mass();
        self.Wmx = gas.mixture_molecular_weight();
        gas.specific_heats(self.cp_spec.as_mut_slice());
        gas.enthalpies(self.hk.as_mut_slice());
        Ok(())
    }

    /// production / destruction terms from the current rates and properties
    fn assemble(&mut self, t: f64, q: &mut DVector<f64>, d: &mut DVector<f64>) {
        let a = self.strain_function.a(t);
        let dadt = self.strain_function.dadt(t);
        self.qdot = 0.0;
        for k in 0..self.n_spec {
            self.qdot -= (self.wdot_q[k] - self.wdot_d[k]) * self.hk[k];
        }

        self.dUdtQ = self.rhou / self.rho * (dadt + a * a);
        self.dUdtD = self.U * self.U;
        self.dTdtQ = self.qdot / (self.rho * self.cp);
        self.dTdtD = 0.0;
        for k in 0..self.n_spec {
            self.dYdtQ[k] = self.wdot_q[k] * self.W[k] / self.rho;
            self.dYdtD[k] = self.wdot_d[k] * self.W[k] / self.rho;
        }

        let sl = &self.split_linear;
        let (uq, ud) = split_sign(self.split_const_U);
        let (lq, ld) = split_sign(sl[0] * self.U);
        self.dUdtQ += uq + lq;
        self.dUdtD += ud + ld;
        let (tq, td) = split_sign(self.split_const_T);
        let (lq, ld) = split_sign(sl[1] * self.T);
        self.dTdtQ += tq + lq;
        self.dTdtD += td + ld;
        for k in 0..self.n_spec {
            let (yq, yd) = split_sign(self.split_const_Y[k]);
            let (lq, ld) = split_sign(sl[2 + k] * self.Y[k]);
            self.dYdtQ[k] += yq + lq;
            self.dYdtD[k] += yd + ld;
        }
        self.roll_ydot(q, d);
    }

    pub fn write_state<O: Write + ?Sized>(&self, out: &mut O, init: bool) -> io::Result<()> {
        let mut table = Table::new();
        if init {
            let mut header = vec![
                Cell::new("j"),
                Cell::new("x"),
                Cell::new("U"),
                Cell::new("dUdtQ"),
                Cell::new("dUdtD"),
                Cell::new("T"),
                Cell::new("dTdtQ"),
            ];
            for k in 0..self.n_spec {
                header.push(Cell::new(&format!("Y{}", k)));
            }
            table.add_row(Row::new(header));
        }
        let mut row = vec![
            Cell::new(&self.j.to_string()),
            Cell::new(&format!("{:e}", self.x)),
            Cell::new(&format!("{:e}", self.U)),
            Cell::new(&format!("{:e}", self.dUdtQ)),
            Cell::new(&format!("{:e}", self.dUdtD)),
            Cell::new(&format!("{:e}", self.T)),
            Cell::new(&format!("{:e}", self.dTdtQ)),
        ];
        for k in 0..self.n_spec {
            row.push(Cell::new(&format!("{:e}", self.Y[k])));
        }
        table.add_row(Row::new(row));
        table.print(out)?;
        Ok(())
    }
}

/// `(c, 0)` for a non-negative constant, `(0, -c)` otherwise
fn split_sign(c: f64) -> (f64, f64) {
    if c >= 0.0 { (c, 0.0) } else { (0.0, -c) }
}

impl<G: ChemistryProvider> QssOde<G> for SourceSystemQss {
    fn predict(
        &mut self,
        gas: &mut G,
        t: f64,
        y: &DVector<f64>,
        q: &mut DVector<f64>,
        d: &mut DVector<f64>,
    ) -> Result<(), SplitError> {
        self.require_ready()?;
        self.check_provider(gas)?;
        self.unroll_y(y, false)?;
        self.update_thermo(gas)?;
        gas.creation_destruction_rates(self.wdot_q.as_mut_slice(), self.wdot_d.as_mut_slice())?;
        self.assemble(t, q, d);
        self.phase = QssPhase::Predicted;
        Ok(())
    }

    fn correct(
        &mut self,
        gas: &mut G,
        t: f64,
        y: &DVector<f64>,
        q: &mut DVector<f64>,
        d: &mut DVector<f64>,
    ) -> Result<(), SplitError> {
        if self.phase == QssPhase::Idle {
            return Err(SplitError::PhaseOrder);
        }
        self.require_ready()?;
        self.check_provider(gas)?;
        self.unroll_y(y, true)?;
        // properties stay at the predictor's values; rates follow the estimate
        gas.set_state_mass(self.Y.as_slice(), self.T)?;
        gas.creation_destruction_rates(self.wdot_q.as_mut_slice(), self.wdot_d.as_mut_slice())?;
        self.assemble(t, q, d);
        self.phase = QssPhase::Corrected;
        Ok(())
    }
}
