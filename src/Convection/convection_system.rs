//! # Convection transport engine
//!
//! Evaluates the convective derivatives of `U`, `T` and `Y` on the whole grid
//! and a diagonal surrogate of its own Jacobian for the other operators of
//! the splitting cycle.
//!
//! ## Flat layout
//! The solver vector is node-major: for node `j` and variable `k`
//!
//! ```text
//! index = j * nVars + k,   k = 0 -> U,  k = 1 -> T,  k = 2 + i -> Y_i
//! ```
//!
//! so a nearest-neighbour stencil has bandwidth `2 * nVars - 1`.
//!
//! ## Mass flux
//! The radial mass flux follows from continuity, starting at the boundary
//! value `rVzero`:
//!
//! ```text
//! rV[j+1] = rV[j] - hh[j] * (r[j] rho[j] U[j] + r[j+1] rho[j+1] U[j+1]) / 2
//! ```
//!
//! and `V = rV / r^alpha` (identity where `r == 0`).
//!
//! ## Upwinding
//! Gradients are first order, taken on the side the flow comes from. At
//! node 0 with `V >= 0` the upstream state is the boundary state (`Tleft`,
//! `Yleft`) at distance `hh[0]`; velocity has no boundary value and gets a
//! zero gradient there. At the last node with `V < 0` the gradient is zero.
use crate::Chemistry::chemistry_api::ChemistryProvider;
use crate::Integrators::integrator::Ode;
use crate::errors::{SplitError, check_len};
use crate::grid::Grid;
use log::debug;
use nalgebra::{DMatrix, DVector};

/// side the upwind neighbour of a node lies on
#[derive(Debug, Clone, Copy, PartialEq)]
enum Upwind {
    /// neighbour `j - 1`, or the boundary state for `j == 0`
    Left,
    Right,
    /// outflow node, zero gradient
    None,
}

pub struct ConvectionSystem<'a, G: ChemistryProvider> {
    grid: &'a Grid,
    gas: &'a mut G,
    pub U: DVector<f64>,
    pub dUdt: DVector<f64>,
    pub T: DVector<f64>,
    pub dTdt: DVector<f64>,
    /// mass fractions, `nSpec x nPoints`
    pub Y: DMatrix<f64>,
    pub dYdt: DMatrix<f64>,
    /// temperature left boundary value
    pub Tleft: f64,
    /// mass fraction left boundary values
    pub Yleft: DVector<f64>,
    /// mass flux boundary value at j = 0
    pub rVzero: f64,
    /// mass flux [kg/m^2/s]
    pub V: DVector<f64>,
    /// `r^alpha * V`
    pub rV: DVector<f64>,
    n_spec: usize,
    n_vars: usize,
    n_points: usize,
    rho: DVector<f64>,
    dUdx: DVector<f64>,
    dTdx: DVector<f64>,
    dYdx: DMatrix<f64>,
    y_node: Vec<f64>,
}

impl<'a, G: ChemistryProvider> ConvectionSystem<'a, G> {
    /// Creates an engine sized for the grid and the provider's species.
    pub fn new(grid: &'a Grid, gas: &'a mut G) -> Self {
        let n_spec = gas.n_species();
        let n_points = grid.n_points();
        let mut system = Self {
            grid,
            gas,
            U: DVector::zeros(0),
            dUdt: DVector::zeros(0),
            T: DVector::zeros(0),
            dTdt: DVector::zeros(0),
            Y: DMatrix::zeros(0, 0),
            dYdt: DMatrix::zeros(0, 0),
            Tleft: 0.0,
            Yleft: DVector::zeros(0),
            rVzero: 0.0,
            V: DVector::zeros(0),
            rV: DVector::zeros(0),
            n_spec: 0,
            n_vars: 2,
            n_points: 0,
            rho: DVector::zeros(0),
            dUdx: DVector::zeros(0),
            dTdx: DVector::zeros(0),
            dYdx: DMatrix::zeros(0, 0),
            y_node: Vec::new(),
        };
        system.resize(n_spec, n_points);
        system
    }

    /// Reallocates every per-node and per-species array. Boundary values are
    /// reset to zero and must be set again by the caller.
    pub fn resize(&mut self, n_spec: usize, n_points: usize) {
        self.n_spec = n_spec;
        self.n_points = n_points;
        self.n_vars = n_spec + 2;
        self.U = DVector::zeros(n_points);
        self.dUdt = DVector::zeros(n_points);
        self.T = DVector::zeros(n_points);
        self.dTdt = DVector::zeros(n_points);
        self.Y = DMatrix::zeros(n_spec, n_points);
        self.dYdt = DMatrix::zeros(n_spec, n_points);
        self.Yleft = DVector::zeros(n_spec);
        self.Tleft = 0.0;
        self.V = DVector::zeros(n_points);
        self.rV = DVector::zeros(n_points);
        self.rho = DVector::zeros(n_points);
        self.dUdx = DVector::zeros(n_points);
        self.dTdx = DVector::zeros(n_points);
        self.dYdx = DMatrix::zeros(n_spec, n_points);
        self.y_node = vec![0.0; n_spec];
        debug!(
            "convection system resized: nSpec = {}, nPoints = {}, nVars = {}",
            n_spec, n_points, self.n_vars
        );
    }

    pub fn n_spec(&self) -> usize {
        self.n_spec
    }
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }
    pub fn n_points(&self) -> usize {
        self.n_points
    }
    /// density per node from the last evaluation
    pub fn density(&self) -> &DVector<f64> {
        &self.rho
    }

    pub fn set_left_boundary(&mut self, t_left: f64, y_left: &[f64]) -> Result<(), SplitError> {
        check_len("ConvectionSystem::set_left_boundary", self.n_spec, y_left.len())?;
        self.Tleft = t_left;
        self.Yleft.copy_from_slice(y_left);
        Ok(())
    }

    fn check_grid(&self) -> Result<(), SplitError> {
        check_len("ConvectionSystem (grid nodes)", self.n_points, self.grid.n_points())
    }

    /// fills `y` with the current state; `y` is resized if needed
    pub fn roll_y(&self, y: &mut DVector<f64>) {
        roll(&self.U, &self.T, &self.Y, self.n_vars, y);
    }

    /// fills `ydot` with the current time derivatives
    pub fn roll_ydot(&self, ydot: &mut DVector<f64>) {
        roll(&self.dUdt, &self.dTdt, &self.dYdt, self.n_vars, ydot);
    }

    /// fills the state arrays from the flat vector `y`
    pub fn unroll_y(&mut self, y: &DVector<f64>) -> Result<(), SplitError> {
        check_len("ConvectionSystem::unroll_y", self.n_vars * self.n_points, y.len())?;
        for j in 0..self.n_points {
            let base = j * self.n_vars;
            self.U[j] = y[base];
            self.T[j] = y[base + 1];
            for k in 0..self.n_spec {
                self.Y[(k, j)] = y[base + 2 + k];
            }
        }
        Ok(())
    }

    /// `rV = r^alpha V`
    pub fn v_to_rv(&mut self) {
        for j in 0..self.n_points {
            let r = self.grid.r[j];
            self.rV[j] = if r == 0.0 { self.V[j] } else { r * self.V[j] };
        }
    }

    /// `V = rV / r^alpha`
    pub fn rv_to_v(&mut self) {
        for j in 0..self.n_points {
            let r = self.grid.r[j];
            self.V[j] = if r == 0.0 { self.rV[j] } else { self.rV[j] / r };
        }
    }

    /// density from the provider at every node, then `rV` and `V` from
    /// continuity
    fn update_flux(&mut self) -> Result<(), SplitError> {
        for j in 0..self.n_points {
            for k in 0..self.n_spec {
                self.y_node[k] = self.Y[(k, j)];
            }
            self.gas.set_state_mass(&self.y_node, self.T[j])?;
            self.rho[j] = self.gas.density();
        }
        let grid = self.grid;
        let (r, hh) = (&grid.r, &grid.hh);
        if self.n_points > 0 {
            self.rV[0] = self.rVzero;
        }
        for j in 0..self.n_points.saturating_sub(1) {
            self.rV[j + 1] = self.rV[j]
                - hh[j] * 0.5 * (r[j] * self.rho[j] * self.U[j]
                    + r[j + 1] * self.rho[j + 1] * self.U[j + 1]);
        }
        self.rv_to_v();
        Ok(())
    }

    fn upwind(&self, j: usize) -> Upwind {
        if self.V[j] >= 0.0 {
            Upwind::Left
        } else if j + 1 < self.n_points {
            Upwind::Right
        } else {
            Upwind::None
        }
    }

    fn compute_gradients(&mut self) {
        let grid = self.grid;
        let hh = &grid.hh;
        for j in 0..self.n_points {
            match self.upwind(j) {
                Upwind::Left if j == 0 => {
                    self.dUdx[j] = 0.0;
                    self.dTdx[j] = (self.T[0] - self.Tleft) / hh[0];
                    for k in 0..self.n_spec {
                        self.dYdx[(k, 0)] = (self.Y[(k, 0)] - self.Yleft[k]) / hh[0];
                    }
                }
                Upwind::Left => {
                    let h = hh[j - 1];
                    self.dUdx[j] = (self.U[j] - self.U[j - 1]) / h;
                    self.dTdx[j] = (self.T[j] - self.T[j - 1]) / h;
                    for k in 0..self.n_spec {
                        self.dYdx[(k, j)] = (self.Y[(k, j)] - self.Y[(k, j - 1)]) / h;
                    }
                }
                Upwind::Right => {
                    let h = hh[j];
                    self.dUdx[j] = (self.U[j + 1] - self.U[j]) / h;
                    self.dTdx[j] = (self.T[j + 1] - self.T[j]) / h;
                    for k in 0..self.n_spec {
                        self.dYdx[(k, j)] = (self.Y[(k, j + 1)] - self.Y[(k, j)]) / h;
                    }
                }
                Upwind::None => {
                    self.dUdx[j] = 0.0;
                    self.dTdx[j] = 0.0;
                    for k in 0..self.n_spec {
                        self.dYdx[(k, j)] = 0.0;
                    }
                }
            }
        }
    }

    /// Diagonal of the convective Jacobian, `-|V| / (rho h_up)` per node for
    /// each variable, evaluated at the current state. Entries are zero where
    /// the derivative uses a zero gradient.
    pub fn get_diagonal(
        &mut self,
        _t: f64,
        dU: &mut DVector<f64>,
        dT: &mut DVector<f64>,
        dY: &mut DMatrix<f64>,
    ) -> Result<(), SplitError> {
        self.check_grid()?;
        check_len("ConvectionSystem::get_diagonal (dU)", self.n_points, dU.len())?;
        check_len("ConvectionSystem::get_diagonal (dT)", self.n_points, dT.len())?;
        check_len("ConvectionSystem::get_diagonal (dY)", self.n_points, dY.ncols())?;
        check_len("ConvectionSystem::get_diagonal (dY)", self.n_spec, dY.nrows())?;
        self.update_flux()?;
        let grid = self.grid;
        let hh = &grid.hh;
        for j in 0..self.n_points {
            let (d_u, d_scalar) = match self.upwind(j) {
                Upwind::Left if j == 0 => (0.0, -self.V[0] / (self.rho[0] * hh[0])),
                Upwind::Left => {
                    let d = -self.V[j] / (self.rho[j] * hh[j - 1]);
                    (d, d)
                }
                Upwind::Right => {
                    let d = self.V[j] / (self.rho[j] * hh[j]);
                    (d, d)
                }
                Upwind::None => (0.0, 0.0),
            };
            dU[j] = d_u;
            dT[j] = d_scalar;
            for k in 0..self.n_spec {
                dY[(k, j)] = d_scalar;
            }
        }
        Ok(())
    }
}

impl<'a, G: ChemistryProvider> Ode for ConvectionSystem<'a, G> {
    fn f(&mut self, _t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), SplitError> {
        self.check_grid()?;
        self.unroll_y(y)?;
        self.update_flux()?;
        self.compute_gradients();
        for j in 0..self.n_points {
            let v_rho = self.V[j] / self.rho[j];
            self.dUdt[j] = -v_rho * self.dUdx[j];
            self.dTdt[j] = -v_rho * self.dTdx[j];
            for k in 0..self.n_spec {
                self.dYdt[(k, j)] = -v_rho * self.dYdx[(k, j)];
            }
        }
        self.roll_ydot(ydot);
        Ok(())
    }
}

/// node-major flattening shared by the state and its derivative
fn roll(u: &DVector<f64>, t: &DVector<f64>, y: &DMatrix<f64>, n_vars: usize, out: &mut DVector<f64>) {
    let n_points = u.len();
    if out.len() != n_vars * n_points {
        *out = DVector::zeros(n_vars * n_points);
    }
    for j in 0..n_points {
        let base = j * n_vars;
        out[base] = u[j];
        out[base + 1] = t[j];
        for k in 0..y.nrows() {
            out[base + 2 + k] = y[(k, j)];
        }
    }
}
