//! # Point reaction system, full-Jacobian form
//!
//! Chemical source term at one grid node with the frozen contribution of the
//! other operators added as split constants:
//!
//! | variable | derivative |
//! |----------|------------|
//! | `U` | `-U² + rhou/rho (dadt + a²) + splitConst[0] + splitLinear[0] U` |
//! | `T` | `qDot / (rho cp) + splitConst[1] + splitLinear[1] T`, `qDot = -Σ wDot_k h_k` |
//! | `Y_k` | `wDot_k W_k / rho + splitConst[2+k] + splitLinear[2+k] Y_k` |
//!
//! The state vector is ordered `[U, T, Y_0 .. Y_{n-1}]`, the per-node order
//! of the whole-grid layout.
//!
//! ## Split constants
//! `reset_split_constants` (or `set_split_constants`) has to be called once
//! per splitting cycle before the first evaluation. A freshly sized system
//! refuses to evaluate until that happens.
//!
//! `set_split_linear` installs the diagonal of the frozen operator (for
//! example the convection Jacobian diagonal). It enters both the right-hand
//! side and the Jacobian diagonal, and is zeroed by `reset_split_constants`.
//!
//! ## Jacobians
//! `dense_jacobian` applies the ideal-gas chain rule around one-sided
//! differences of the provider's rates; `fd_jacobian` differences the whole
//! right-hand side. Both agree to truncation error.
use crate::Chemistry::chemistry_api::ChemistryProvider;
use crate::errors::{SplitError, check_len};
use crate::strain_function::{StrainFunction, StrainRate};
use nalgebra::{DMatrix, DVector};
use prettytable::{Cell, Row, Table};
use std::io::{self, Write};

/// relative perturbation used by both Jacobian routines
pub fn jacobian_perturbation() -> f64 {
    f64::EPSILON.sqrt() * 1e2
}

#[derive(Debug, Clone)]
pub struct SourceSystem {
    /// tangential velocity
    pub U: f64,
    pub dUdt: f64,
    pub T: f64,
    pub dTdt: f64,
    pub Y: DVector<f64>,
    pub dYdt: DVector<f64>,
    /// constant terms introduced by splitting, `[U, T, Y..]`
    pub split_const: DVector<f64>,
    /// per-variable linear coefficients introduced by splitting, `[U, T, Y..]`
    pub split_linear: DVector<f64>,
    /// diagonal of the last dense Jacobian, filled if `update_diagonal_jac`
    pub diagonal_jac: DVector<f64>,
    pub update_diagonal_jac: bool,
    pub strain_function: StrainFunction,
    /// grid index of this system
    pub j: usize,
    /// grid position of this system
    pub x: f64,
    /// species molecular weights [kg/kmol]
    pub W: DVector<f64>,
    /// density of the unburned mixture
    pub rhou: f64,
    /// net production rates [kmol/m^3/s]
    pub wdot: DVector<f64>,
    /// heat release rate [W/m^3]
    pub qdot: f64,
    n_spec: usize,
    rho: f64,
    /// mass heat capacity [J/kg/K]
    cp: f64,
    /// species molar heat capacities [J/kmol/K]
    cp_spec: DVector<f64>,
    Wmx: f64,
    /// species molar enthalpies [J/kmol]
    hk: DVector<f64>,
    split_consts_ready: bool,
}

impl SourceSystem {
    pub fn new(n_spec: usize) -> Self {
        let mut system = Self {
            U: 0.0,
            dUdt: 0.0,
            T: 0.0,
            dTdt: 0.0,
            Y: DVector::zeros(0),
            dYdt: DVector::zeros(0),
            split_const: DVector::zeros(0),
            split_linear: DVector::zeros(0),
            diagonal_jac: DVector::zeros(0),
            update_diagonal_jac: false,
            strain_function: StrainFunction::default(),
            j: 0,
            x: 0.0,
            W: DVector::zeros(0),
            rhou: 0.0,
            wdot: DVector::zeros(0),
            qdot: 0.0,
            n_spec: 0,
            rho: 0.0,
            cp: 0.0,
            cp_spec: DVector::zeros(0),
            Wmx: 0.0,
            hk: DVector::zeros(0),
            split_consts_ready: false,
        };
        system.resize(n_spec);
        system
    }

    /// sized for the provider's species, with its molecular weights
    pub fn for_provider<G: ChemistryProvider>(gas: &G) -> Self {
        let mut system = Self::new(gas.n_species());
        system.W.copy_from_slice(gas.molecular_weights());
        system
    }

    /// Reallocates the per-species arrays. Molecular weights and split
    /// constants have to be set again.
    pub fn resize(&mut self, n_spec: usize) {
        self.n_spec = n_spec;
        let n_vars = n_spec + 2;
        self.Y = DVector::zeros(n_spec);
        self.dYdt = DVector::zeros(n_spec);
        self.split_const = DVector::zeros(n_vars);
        self.split_linear = DVector::zeros(n_vars);
        self.diagonal_jac = DVector::zeros(n_vars);
        self.W = DVector::zeros(n_spec);
        self.wdot = DVector::zeros(n_spec);
        self.cp_spec = DVector::zeros(n_spec);
        self.hk = DVector::zeros(n_spec);
        self.split_consts_ready = false;
    }

    pub fn n_spec(&self) -> usize {
        self.n_spec
    }
    pub fn n_vars(&self) -> usize {
        self.n_spec + 2
    }
    /// density at the last evaluated state
    pub fn density(&self) -> f64 {
        self.rho
    }
    pub fn cp(&self) -> f64 {
        self.cp
    }

    /// zeroes the split constants; starts a new splitting cycle
    pub fn reset_split_constants(&mut self) {
        self.split_const.fill(0.0);
        self.split_linear.fill(0.0);
        self.split_consts_ready = true;
    }

    /// installs this cycle's split constants, ordered `[U, T, Y..]`
    pub fn set_split_constants(&mut self, values: &DVector<f64>) -> Result<(), SplitError> {
        check_len("SourceSystem::set_split_constants", self.n_vars(), values.len())?;
        self.split_const.copy_from(values);
        self.split_consts_ready = true;
        Ok(())
    }

    /// installs the diagonal linear term, ordered `[U, T, Y..]`
    pub fn set_split_linear(&mut self, values: &DVector<f64>) -> Result<(), SplitError> {
        check_len("SourceSystem::set_split_linear", self.n_vars(), values.len())?;
        self.split_linear.copy_from(values);
        Ok(())
    }

    /// Marks the split constants as consumed at the end of a sub-step; the
    /// next evaluation fails until they are reset for the new cycle.
    pub fn finish_cycle(&mut self) {
        self.split_consts_ready = false;
    }

    pub fn split_constants_ready(&self) -> bool {
        self.split_consts_ready
    }

    pub fn unroll_y(&mut self, y: &DVector<f64>) -> Result<(), SplitError> {
        check_len("SourceSystem::unroll_y", self.n_vars(), y.len())?;
        self.U = y[0];
        self.T = y[1];
        for k in 0..self.n_spec {
            self.Y[k] = y[2 + k];
        }
        Ok(())
    }

    pub fn roll_y(&self, y: &mut DVector<f64>) {
        roll_point(self.U, self.T, &self.Y, y);
    }

    pub fn roll_ydot(&self, ydot: &mut DVector<f64>) {
        roll_point(self.dUdt, self.dTdt, &self.dYdt, ydot);
    }

    fn check_provider<G: ChemistryProvider>(&self, gas: &G) -> Result<(), SplitError> {
        check_len("SourceSystem (provider species)", self.n_spec, gas.n_species())?;
        check_len("SourceSystem (molecular weights)", self.n_spec, self.W.len())
    }

    /// installs `(Y, T)` in the provider and refreshes the property scratch
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

    fn update_rates<G: ChemistryProvider>(&mut self, gas: &mut G) -> Result<(), SplitError> {
        gas.net_production_rates(self.wdot.as_mut_slice())?;
        self.qdot = -self.wdot.dot(&self.hk);
        Ok(())
    }

    /// right-hand side at `(t, y)`
    pub fn f<G: ChemistryProvider>(
        &mut self,
        gas: &mut G,
        t: f64,
        y: &DVector<f64>,
        ydot: &mut DVector<f64>,
    ) -> Result<(), SplitError> {
        if !self.split_consts_ready {
            return Err(SplitError::SplitConstantsNotReset);
        }
        self.check_provider(gas)?;
        self.unroll_y(y)?;
        self.update_thermo(gas)?;
        self.update_rates(gas)?;

        let a = self.strain_function.a(t);
        let dadt = self.strain_function.dadt(t);
        let sc = &self.split_const;
        let sl = &self.split_linear;
        self.dUdt =
            -self.U * self.U + self.rhou / self.rho * (dadt + a * a) + sc[0] + sl[0] * self.U;
        self.dTdt = self.qdot / (self.rho * self.cp) + sc[1] + sl[1] * self.T;
        for k in 0..self.n_spec {
            self.dYdt[k] = self.wdot[k] * self.W[k] / self.rho + sc[2 + k] + sl[2 + k] * self.Y[k];
        }
        self.roll_ydot(ydot);
        Ok(())
    }

    /// Jacobian `J = df/dy` from the chain rule: rates are differenced
    /// one-sidedly through the provider, density, heat capacity and
    /// enthalpies are differentiated analytically.
    pub fn dense_jacobian<G: ChemistryProvider>(
        &mut self,
        gas: &mut G,
        t: f64,
        y: &DVector<f64>,
        J: &mut DMatrix<f64>,
    ) -> Result<(), SplitError> {
        self.check_provider(gas)?;
        self.unroll_y(y)?;
        let n = self.n_spec;
        let n_vars = self.n_vars();
        if J.shape() != (n_vars, n_vars) {
            *J = DMatrix::zeros(n_vars, n_vars);
        }
        J.fill(0.0);
        self.update_thermo(gas)?;
        self.update_rates(gas)?;
        let eps = jacobian_perturbation();

        // temperature derivatives of the rates and of cp
        let t_plus = self.T * (1.0 + eps);
        let dt = t_plus - self.T;
        let mut wdot_plus: DVector<f64> = DVector::zeros(n);
        gas.set_state_mass(self.Y.as_slice(), t_plus)?;
        gas.net_production_rates(wdot_plus.as_mut_slice())?;
        let dwdot_dT = (&wdot_plus - &self.wdot) / dt;
        let dcp_dT = (gas.cp_mass() - self.cp) / dt;

        // mass fraction derivatives of the rates, one column per species
        let mut dwdot_dY: DMatrix<f64> = DMatrix::zeros(n, n);
        let mut y_plus = self.Y.clone();
        for i in 0..n {
            y_plus[i] += eps;
            gas.set_state_mass(y_plus.as_slice(), self.T)?;
            gas.net_production_rates(wdot_plus.as_mut_slice())?;
            dwdot_dY.set_column(i, &((&wdot_plus - &self.wdot) / eps));
            y_plus[i] = self.Y[i];
        }
        // leave the provider at the evaluation state
        gas.set_state_mass(self.Y.as_slice(), self.T)?;

        let a = self.strain_function.a(t);
        let dadt = self.strain_function.dadt(t);
        let strain = dadt + a * a;
        let (rho, cp, Wmx) = (self.rho, self.cp, self.Wmx);
        let temp_rate = self.qdot / (rho * cp);

        // velocity
        J[(0, 0)] = -2.0 * self.U;
        J[(0, 1)] = self.rhou * strain / (rho * self.T);
        for k in 0..n {
            J[(0, 2 + k)] = self.rhou / rho * strain * Wmx / self.W[k];
        }

        // temperature
        let mut dqdot_dT = 0.0;
        for k in 0..n {
            dqdot_dT -= dwdot_dT[k] * self.hk[k] + self.wdot[k] * self.cp_spec[k];
        }
        J[(1, 1)] = dqdot_dT / (rho * cp) - temp_rate * (-1.0 / self.T + dcp_dT / cp);
        for i in 0..n {
            let dqdot_dY: f64 = -(0..n).map(|k| dwdot_dY[(k, i)] * self.hk[k]).sum::<f64>();
            let drho_rho = -Wmx / self.W[i];
            let dcp_cp = self.cp_spec[i] / (self.W[i] * cp);
            J[(1, 2 + i)] = dqdot_dY / (rho * cp) - temp_rate * (drho_rho + dcp_cp);
        }

        // species
        for k in 0..n {
            let scale = self.W[k] / rho;
            J[(2 + k, 1)] = scale * (dwdot_dT[k] + self.wdot[k] / self.T);
            for i in 0..n {
                J[(2 + k, 2 + i)] = scale * (dwdot_dY[(k, i)] + self.wdot[k] * Wmx / self.W[i]);
            }
        }

        for i in 0..n_vars {
            J[(i, i)] += self.split_linear[i];
        }

        if self.update_diagonal_jac {
            self.diagonal_jac = J.diagonal();
        }
        Ok(())
    }

    /// One-sided finite-difference Jacobian of `f` around `(y, ydot)`, where
    /// `ydot` must be `f(t, y)`. The system is left evaluated at `y`.
    pub fn fd_jacobian<G: ChemistryProvider>(
        &mut self,
        gas: &mut G,
        t: f64,
        y: &DVector<f64>,
        ydot: &DVector<f64>,
        J: &mut DMatrix<f64>,
    ) -> Result<(), SplitError> {
        let n_vars = self.n_vars();
        check_len("SourceSystem::fd_jacobian (y)", n_vars, y.len())?;
        check_len("SourceSystem::fd_jacobian (ydot)", n_vars, ydot.len())?;
        if J.shape() != (n_vars, n_vars) {
            *J = DMatrix::zeros(n_vars, n_vars);
        }
        let eps = jacobian_perturbation();
        let mut y_plus = y.clone();
        let mut ydot_plus: DVector<f64> = DVector::zeros(n_vars);
        for i in 0..n_vars {
            let h = eps * (y[i].abs() + 1.0);
            y_plus[i] = y[i] + h;
            let dy = y_plus[i] - y[i];
            self.f(gas, t, &y_plus, &mut ydot_plus)?;
            J.set_column(i, &((&ydot_plus - ydot) / dy));
            y_plus[i] = y[i];
        }
        self.f(gas, t, y, &mut ydot_plus)?;
        Ok(())
    }

    /// One table row per call: grid index, position, state and derivatives.
    /// The header row is written when `init` is set.
    pub fn write_state<O: Write + ?Sized>(&self, out: &mut O, init: bool) -> io::Result<()> {
        let mut table = Table::new();
        if init {
            let mut header = vec![
                Cell::new("j"),
                Cell::new("x"),
                Cell::new("U"),
                Cell::new("dUdt"),
                Cell::new("T"),
                Cell::new("dTdt"),
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
            Cell::new(&format!("{:e}", self.dUdt)),
            Cell::new(&format!("{:e}", self.T)),
            Cell::new(&format!("{:e}", self.dTdt)),
        ];
        for k in 0..self.n_spec {
            row.push(Cell::new(&format!("{:e}", self.Y[k])));
        }
        table.add_row(Row::new(row));
        table.print(out)?;
        Ok(())
    }

    /// writes `J` with variable names on both axes
    pub fn write_jacobian<O: Write + ?Sized>(&self, J: &DMatrix<f64>, out: &mut O) -> io::Result<()> {
        let names: Vec<String> = ["U".to_string(), "T".to_string()]
            .into_iter()
            .chain((0..self.n_spec).map(|k| format!("Y{}", k)))
            .collect();
        let mut table = Table::new();
        let mut header = vec![Cell::new("d/d")];
        header.extend(names.iter().map(|n| Cell::new(n)));
        table.add_row(Row::new(header));
        for i in 0..J.nrows() {
            let mut row = vec![Cell::new(names.get(i).map(|s| s.as_str()).unwrap_or("?"))];
            for j in 0..J.ncols() {
                row.push(Cell::new(&format!("{:.4e}", J[(i, j)])));
            }
            table.add_row(Row::new(row));
        }
        table.print(out)?;
        Ok(())
    }
}

pub(crate) fn roll_point(u: f64, t: f64, y: &DVector<f64>, out: &mut DVector<f64>) {
    let n_vars = y.len() + 2;
    if out.len() != n_vars {
        *out = DVector::zeros(n_vars);
    }
    out[0] = u;
    out[1] = t;
    for k in 0..y.len() {
        out[2 + k] = y[k];
    }
}
