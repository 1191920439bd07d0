//! # Banded matrix with LU factorization
//!
//! Storage follows the LAPACK `xGBTRF` convention: a `(2*kl + ku + 1) x n`
//! array where entry `A(i, j)` lives in row `kl + ku + i - j` of column `j`.
//! The top `kl` rows are workspace for the fill-in created by row
//! interchanges, so a factorized matrix keeps `U` with upper bandwidth
//! `kl + ku` and the multipliers of `L` below the diagonal.
//!
//! ```text
//!  n = 5, ku = 1, kl = 1          storage (kv = kl + ku = 2)
//!  | a00 a01  .   .   .  |        row 0:  *   *  f02 f13 f24   <- fill-in
//!  | a10 a11 a12  .   .  |        row 1:  *  a01 a12 a23 a34
//!  |  .  a21 a22 a23  .  |        row 2: a00 a11 a22 a33 a44
//!  |  .   .  a32 a33 a34 |        row 3: a10 a21 a32 a43  *
//!  |  .   .   .  a43 a44 |
//! ```
use crate::errors::SplitError;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct BandMatrix {
    n: usize,
    ku: usize,
    kl: usize,
    data: DMatrix<f64>,
}

impl BandMatrix {
    pub fn new(n: usize, ku: usize, kl: usize) -> Self {
        Self {
            n,
            ku,
            kl,
            data: DMatrix::zeros(2 * kl + ku + 1, n),
        }
    }

    /// copies the band of a dense matrix; entries outside the band are dropped
    pub fn from_dense(m: &DMatrix<f64>, ku: usize, kl: usize) -> Self {
        let n = m.nrows();
        let mut band = Self::new(n, ku, kl);
        for j in 0..n {
            let i0 = j.saturating_sub(ku);
            let i1 = (j + kl).min(n - 1);
            for i in i0..=i1 {
                band.set(i, j, m[(i, j)]);
            }
        }
        band
    }

    pub fn n(&self) -> usize {
        self.n
    }
    pub fn upper_bandwidth(&self) -> usize {
        self.ku
    }
    pub fn lower_bandwidth(&self) -> usize {
        self.kl
    }

    /// true if `(i, j)` lies inside the logical band
    pub fn in_band(&self, i: usize, j: usize) -> bool {
        i < self.n && j < self.n && i <= j + self.kl && j <= i + self.ku
    }

    fn row(&self, i: usize, j: usize) -> usize {
        self.kl + self.ku + i - j
    }

    // access including the fill-in rows used by the factorization
    fn at(&self, i: usize, j: usize) -> f64 {
        self.data[(self.row(i, j), j)]
    }
    fn at_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        let r = self.row(i, j);
        &mut self.data[(r, j)]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        if self.in_band(i, j) { self.at(i, j) } else { 0.0 }
    }

    /// # Panics
    /// if `(i, j)` is outside the band
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(
            self.in_band(i, j),
            "entry ({}, {}) outside band (ku = {}, kl = {})",
            i,
            j,
            self.ku,
            self.kl
        );
        *self.at_mut(i, j) = value;
    }

    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let v = self.get(i, j);
        self.set(i, j, v + value);
    }

    pub fn fill_zero(&mut self) {
        self.data.fill(0.0);
    }

    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_fn(self.n, |i, _| self.at(i, i))
    }

    /// `I - h * self`, with the same bandwidths
    pub fn identity_minus_scaled(&self, h: f64) -> BandMatrix {
        let mut m = BandMatrix::new(self.n, self.ku, self.kl);
        for j in 0..self.n {
            let i0 = j.saturating_sub(self.ku);
            let i1 = (j + self.kl).min(self.n - 1);
            for i in i0..=i1 {
                let delta = if i == j { 1.0 } else { 0.0 };
                *m.at_mut(i, j) = delta - h * self.at(i, j);
            }
        }
        m
    }

    /// `out = self * x` for an unfactorized matrix
    pub fn mul_vec(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        out.fill(0.0);
        for j in 0..self.n {
            let i0 = j.saturating_sub(self.ku);
            let i1 = (j + self.kl).min(self.n - 1);
            for i in i0..=i1 {
                out[i] += self.at(i, j) * x[j];
            }
        }
    }

    /// In-place LU factorization with partial pivoting (unblocked `GBTF2`).
    /// `pivots[j]` receives the row interchanged with row `j`.
    pub fn factorize(&mut self, pivots: &mut Vec<usize>) -> Result<(), SplitError> {
        let n = self.n;
        let (kl, ku) = (self.kl, self.ku);
        pivots.clear();
        pivots.resize(n, 0);
        // the fill-in rows must start from zero
        for j in 0..n {
            for r in 0..kl {
                self.data[(r, j)] = 0.0;
            }
        }
        let mut ju = 0;
        for j in 0..n {
            let km = kl.min(n - 1 - j);
            let mut p = j;
            let mut pmax = self.at(j, j).abs();
            for i in j + 1..=j + km {
                let v = self.at(i, j).abs();
                if v > pmax {
                    pmax = v;
                    p = i;
                }
            }
            pivots[j] = p;
            if pmax == 0.0 || !pmax.is_finite() {
                return Err(SplitError::SingularMatrix { column: j });
            }
            // last column touched by the interchange
            ju = ju.max((p + ku).min(n - 1));
            if p != j {
                for c in j..=ju {
                    let tmp = self.at(j, c);
                    *self.at_mut(j, c) = self.at(p, c);
                    *self.at_mut(p, c) = tmp;
                }
            }
            let pivot = self.at(j, j);
            for i in j + 1..=j + km {
                *self.at_mut(i, j) /= pivot;
            }
            for c in j + 1..=ju {
                let ujc = self.at(j, c);
                if ujc != 0.0 {
                    for i in j + 1..=j + km {
                        let lij = self.at(i, j);
                        *self.at_mut(i, c) -= lij * ujc;
                    }
                }
            }
        }
        Ok(())
    }

    /// Solves `A x = b` in place using a matrix factorized by
    /// [`BandMatrix::factorize`].
    pub fn solve(&self, pivots: &[usize], b: &mut DVector<f64>) {
        let n = self.n;
        let kl = self.kl;
        let kv = self.kl + self.ku;
        if kl > 0 {
            for j in 0..n.saturating_sub(1) {
                let lm = kl.min(n - 1 - j);
                let p = pivots[j];
                if p != j {
                    b.swap_rows(p, j);
                }
                let bj = b[j];
                for i in j + 1..=j + lm {
                    b[i] -= self.at(i, j) * bj;
                }
            }
        }
        for j in (0..n).rev() {
            b[j] /= self.at(j, j);
            let bj = b[j];
            for i in j.saturating_sub(kv)..j {
                b[i] -= self.at(i, j) * bj;
            }
        }
    }
}
