//! Minimal one-dimensional grid record: node positions, spacings and the
//! geometry class. Mesh generation and adaptation live outside this crate.
use crate::errors::SplitError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Geometry {
    Planar,
    Axisymmetric,
}

impl Geometry {
    /// curvature exponent: 0 for planar, 1 for axisymmetric
    pub fn alpha(&self) -> i32 {
        match self {
            Geometry::Planar => 0,
            Geometry::Axisymmetric => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    /// node positions, strictly increasing
    pub x: DVector<f64>,
    /// spacings, `hh[j] = x[j+1] - x[j]`
    pub hh: DVector<f64>,
    /// `x[j]^alpha`
    pub r: DVector<f64>,
    pub geometry: Geometry,
}

impl Grid {
    pub fn new(x: DVector<f64>, geometry: Geometry) -> Result<Self, SplitError> {
        if x.len() < 2 {
            return Err(SplitError::dimension("Grid::new (number of nodes >= 2)", 2, x.len()));
        }
        let n = x.len();
        let hh = DVector::from_fn(n - 1, |j, _| x[j + 1] - x[j]);
        if let Some(j) = hh.iter().position(|h| !(*h > 0.0)) {
            return Err(SplitError::Config(format!(
                "grid nodes must be strictly increasing (between nodes {} and {})",
                j,
                j + 1
            )));
        }
        if geometry == Geometry::Axisymmetric && x[0] < 0.0 {
            return Err(SplitError::Config(
                "axisymmetric grid must start at x >= 0".to_string(),
            ));
        }
        let r = x.map(|xj| xj.powi(geometry.alpha()));
        Ok(Self { x, hh, r, geometry })
    }

    /// uniform grid on `[x0, x1]` with `n_points` nodes
    pub fn uniform(x0: f64, x1: f64, n_points: usize, geometry: Geometry) -> Result<Self, SplitError> {
        let n = n_points.max(2);
        let x = DVector::from_fn(n, |j, _| x0 + (x1 - x0) * j as f64 / (n - 1) as f64);
        Self::new(x, geometry)
    }

    pub fn n_points(&self) -> usize {
        self.x.len()
    }

    pub fn alpha(&self) -> i32 {
        self.geometry.alpha()
    }
}
