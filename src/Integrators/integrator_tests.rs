#[cfg(test)]
mod tests {
    use super::super::band_matrix::BandMatrix;
    use super::super::bdf_integrator::BdfIntegrator;
    use super::super::explicit_integrator::ExplicitIntegrator;
    use super::super::integrator::*;
    use crate::errors::SplitError;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    /// ydot = -k y
    struct Decay {
        k: f64,
        n_calls: usize,
    }

    impl Ode for Decay {
        fn f(&mut self, _t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), SplitError> {
            *ydot = y * (-self.k);
            self.n_calls += 1;
            Ok(())
        }
    }

    /// A = -k I, c = const
    struct LinearDecay {
        k: f64,
        c: f64,
        n_a_queries: usize,
        resized_to: usize,
    }

    impl LinearOde for LinearDecay {
        fn get_a(&mut self, _t: f64, a: &mut BandMatrix) -> Result<(), SplitError> {
            for i in 0..a.n() {
                a.set(i, i, -self.k);
            }
            self.n_a_queries += 1;
            Ok(())
        }
        fn get_c(&mut self, _t: f64, c: &mut DVector<f64>) -> Result<(), SplitError> {
            c.fill(self.c);
            Ok(())
        }
        fn resize(&mut self, n: usize) {
            self.resized_to = n;
        }
    }

    /// tridiagonal coupling, A = [[-2, 1, 0], [1, -2, 1], [0, 1, -2]]
    struct Tridiagonal;

    impl LinearOde for Tridiagonal {
        fn get_a(&mut self, _t: f64, a: &mut BandMatrix) -> Result<(), SplitError> {
            let n = a.n();
            for i in 0..n {
                a.set(i, i, -2.0);
                if i + 1 < n {
                    a.set(i, i + 1, 1.0);
                    a.set(i + 1, i, 1.0);
                }
            }
            Ok(())
        }
        fn get_c(&mut self, _t: f64, c: &mut DVector<f64>) -> Result<(), SplitError> {
            c.fill(0.0);
            Ok(())
        }
    }

    fn linear_decay(k: f64, c: f64) -> LinearDecay {
        LinearDecay {
            k,
            c,
            n_a_queries: 0,
            resized_to: 0,
        }
    }

    #[test]
    fn test_explicit_single_step_is_exact() {
        let mut ode = Decay { k: 1.0, n_calls: 0 };
        let mut integ = ExplicitIntegrator::new(&mut ode);
        let y0 = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        integ.set_y0(&y0).unwrap();
        integ.initialize(0.0, 0.125).unwrap();
        integ.step().unwrap();
        // dyadic values: exact in binary floating point
        let expected = y0 * (1.0 - 0.125);
        assert_eq!(integ.get_y(), &expected);
        assert_eq!(integ.get_t(), 0.125);
        assert_eq!(integ.ode().n_calls, 1);
    }

    #[test]
    fn test_explicit_integrate_lands_on_end_time() {
        let mut ode = Decay { k: 1.0, n_calls: 0 };
        let mut integ = ExplicitIntegrator::new(&mut ode);
        integ.set_y0(&DVector::from_element(2, 1.0)).unwrap();
        integ.initialize(0.0, 0.3).unwrap();
        integ.integrate_to_time(1.0).unwrap();
        assert_eq!(integ.get_t(), 1.0);
        // nominal step size survives the shortened last step
        assert_eq!(integ.get_h(), 0.3);
        // 0.3, 0.3, 0.3, 0.1
        let expected = 0.7f64.powi(3) * 0.9;
        assert_relative_eq!(integ.get_y()[0], expected, epsilon = 1e-12);
        assert_eq!(integ.ode().n_calls, 4);
    }

    #[test]
    fn test_explicit_converges_to_exponential() {
        let mut ode = Decay { k: 2.0, n_calls: 0 };
        let mut integ = ExplicitIntegrator::new(&mut ode);
        integ.set_y0(&DVector::from_element(1, 1.0)).unwrap();
        integ.initialize(0.0, 1e-5).unwrap();
        integ.integrate_to_time(0.5).unwrap();
        assert_relative_eq!(integ.get_y()[0], (-1.0f64).exp(), max_relative = 1e-4);
    }

    #[test]
    fn test_explicit_ydot() {
        let mut ode = Decay { k: 3.0, n_calls: 0 };
        let mut integ = ExplicitIntegrator::new(&mut ode);
        integ.set_y0(&DVector::from_vec(vec![1.0, 2.0])).unwrap();
        integ.initialize(0.0, 0.1).unwrap();
        let ydot = integ.get_ydot().unwrap().clone();
        assert_eq!(ydot, DVector::from_vec(vec![-3.0, -6.0]));
    }

    #[test]
    fn test_step_before_initialize_fails() {
        let mut ode = Decay { k: 1.0, n_calls: 0 };
        let mut integ = ExplicitIntegrator::new(&mut ode);
        assert!(matches!(integ.step(), Err(SplitError::NotInitialized(_))));
        assert!(matches!(
            integ.initialize(0.0, 0.1),
            Err(SplitError::NotInitialized(_))
        ));
        integ.set_y0(&DVector::from_element(1, 1.0)).unwrap();
        assert!(matches!(
            integ.initialize(0.0, -0.1),
            Err(SplitError::InvalidStepSize(_))
        ));
        assert!(matches!(
            integ.initialize(0.0, f64::NAN),
            Err(SplitError::InvalidStepSize(_))
        ));
        assert!(matches!(
            integ.integrate_to_time(1.0),
            Err(SplitError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_explicit_refuses_to_integrate_backwards() {
        let mut ode = Decay { k: 1.0, n_calls: 0 };
        let mut integ = ExplicitIntegrator::new(&mut ode);
        integ.set_y0(&DVector::from_element(1, 1.0)).unwrap();
        integ.initialize(0.0, 0.1).unwrap();
        integ.integrate_to_time(1.0).unwrap();
        let y1 = integ.get_y().clone();
        assert!(matches!(
            integ.integrate_to_time(0.5),
            Err(SplitError::TimeOrder { t_end, .. }) if t_end == 0.5
        ));
        assert_eq!(integ.get_t(), 1.0);
        assert_eq!(integ.get_y(), &y1);
        // asking for the current time is a no-op
        integ.integrate_to_time(1.0).unwrap();
        assert_eq!(integ.get_t(), 1.0);
        assert_eq!(integ.get_y(), &y1);
    }

    #[test]
    fn test_implicit_single_step_is_exact() {
        let k = 3.0;
        let h = 0.25;
        let mut ode = linear_decay(k, 0.0);
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(3, 0, 0);
        let y0 = DVector::from_vec(vec![1.0, 7.0, -3.5]);
        integ.set_y0(&y0).unwrap();
        integ.initialize(0.0, h).unwrap();
        integ.step().unwrap();
        // 1 + h k = 1.75
        for i in 0..3 {
            assert_eq!(integ.get_y()[i], y0[i] / (1.0 + h * k));
        }
        assert_eq!(integ.previous_y(), &y0);
        assert_eq!(integ.get_diagonal(), &DVector::from_element(3, -k));
        assert_eq!(integ.ode().resized_to, 3);
    }

    #[test]
    fn test_implicit_operator_is_queried_once_per_sub_step() {
        let mut ode = linear_decay(1.0, 0.5);
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(2, 0, 0);
        integ.set_y0(&DVector::from_element(2, 1.0)).unwrap();
        integ.initialize(0.0, 0.1).unwrap();
        integ.integrate_to_time(1.05).unwrap();
        assert_eq!(integ.get_t(), 1.05);
        assert_eq!(integ.get_h(), 0.1);
        assert_eq!(integ.step_count(), 11);
        assert_eq!(integ.ode().n_a_queries, 1);
        // new sub-step: the operator is requested again
        let y = integ.get_y().clone();
        integ.set_y0(&y).unwrap();
        integ.initialize(1.05, 0.1).unwrap();
        integ.step().unwrap();
        assert_eq!(integ.ode().n_a_queries, 2);
    }

    #[test]
    fn test_implicit_approaches_steady_state() {
        // ydot = -y + 0.5 has the fixed point y = 0.5
        let mut ode = linear_decay(1.0, 0.5);
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(1, 0, 0);
        integ.set_y0(&DVector::from_element(1, 4.0)).unwrap();
        integ.initialize(0.0, 10.0).unwrap();
        integ.integrate_to_time(1000.0).unwrap();
        assert_relative_eq!(integ.get_y()[0], 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_implicit_refuses_to_integrate_backwards() {
        let mut ode = linear_decay(1.0, 0.0);
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(1, 0, 0);
        integ.set_y0(&DVector::from_element(1, 1.0)).unwrap();
        integ.initialize(0.0, 0.1).unwrap();
        integ.integrate_to_time(1.0).unwrap();
        let steps = integ.step_count();
        assert!(matches!(
            integ.integrate_to_time(0.5),
            Err(SplitError::TimeOrder { .. })
        ));
        assert_eq!(integ.get_t(), 1.0);
        assert_eq!(integ.step_count(), steps);
    }

    fn implicit_error(h: f64) -> f64 {
        let mut ode = linear_decay(1.0, 0.0);
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(1, 0, 0);
        integ.set_y0(&DVector::from_element(1, 1.0)).unwrap();
        integ.initialize(0.0, h).unwrap();
        integ.integrate_to_time(1.0).unwrap();
        (integ.get_y()[0] - (-1.0f64).exp()).abs()
    }

    #[test]
    fn test_implicit_is_second_order() {
        let e1 = implicit_error(0.02);
        let e2 = implicit_error(0.01);
        let ratio = e1 / e2;
        assert!(ratio > 3.6 && ratio < 4.4, "error ratio {}", ratio);
        // backward Euler alone would leave an error of about h/2 * exp(-1)
        assert!(e2 < 1e-4, "error {}", e2);
    }

    #[test]
    fn test_implicit_second_step_uses_two_previous_states() {
        let (k, h) = (2.0, 0.25);
        let mut ode = linear_decay(k, 1.0);
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(1, 0, 0);
        integ.set_y0(&DVector::from_element(1, 1.0)).unwrap();
        integ.initialize(0.0, h).unwrap();
        integ.step().unwrap();
        let y1 = integ.get_y()[0];
        assert_relative_eq!(y1, (1.0 + h) / (1.0 + h * k), epsilon = 1e-14);
        integ.step().unwrap();
        let expected = (4.0 / 3.0 * y1 - 1.0 / 3.0 + 2.0 / 3.0 * h) / (1.0 + 2.0 / 3.0 * h * k);
        assert_relative_eq!(integ.get_y()[0], expected, epsilon = 1e-14);
        assert_eq!(integ.previous_y()[0], y1);
    }

    #[test]
    fn test_implicit_ydot_matches_operator() {
        let mut ode = linear_decay(2.0, 1.0);
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(2, 0, 0);
        integ.set_y0(&DVector::from_vec(vec![1.0, 3.0])).unwrap();
        integ.initialize(0.0, 0.1).unwrap();
        let ydot = integ.get_ydot().unwrap().clone();
        assert_eq!(ydot, DVector::from_vec(vec![-1.0, -5.0]));
    }

    #[test]
    fn test_implicit_banded_system_matches_dense_solve() {
        let h = 0.5;
        let mut ode = Tridiagonal;
        let mut integ = BdfIntegrator::new(&mut ode);
        integ.resize(3, 1, 1);
        let y0 = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        integ.set_y0(&y0).unwrap();
        integ.initialize(0.0, h).unwrap();
        integ.step().unwrap();
        let a = DMatrix::from_row_slice(3, 3, &[-2.0, 1.0, 0.0, 1.0, -2.0, 1.0, 0.0, 1.0, -2.0]);
        let m = DMatrix::identity(3, 3) - a * h;
        let expected = m.lu().solve(&y0).unwrap();
        for i in 0..3 {
            assert_relative_eq!(integ.get_y()[i], expected[i], epsilon = 1e-13);
        }
    }

    #[test]
    fn test_set_y0_checks_size() {
        let mut ode = linear_decay(1.0, 0.0);
        let mut integ = BdfIntegrator::new(&mut ode);
        assert!(matches!(
            integ.set_y0(&DVector::zeros(2)),
            Err(SplitError::NotInitialized(_))
        ));
        integ.resize(3, 0, 0);
        assert!(matches!(
            integ.set_y0(&DVector::zeros(2)),
            Err(SplitError::DimensionMismatch { expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn test_band_lu_with_pivoting() {
        // small diagonal forces row interchanges
        let dense = DMatrix::from_row_slice(
            5,
            5,
            &[
                1e-3, 2.0, 0.0, 0.0, 0.0, //
                3.0, 1e-3, 1.0, 0.0, 0.0, //
                0.0, 4.0, 0.5, -1.0, 0.0, //
                0.0, 0.0, 2.0, 1e-4, 3.0, //
                0.0, 0.0, 0.0, -5.0, 1.0,
            ],
        );
        let mut band = BandMatrix::from_dense(&dense, 1, 1);
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(band.get(i, j), dense[(i, j)]);
            }
        }
        let b = DVector::from_vec(vec![1.0, -2.0, 3.0, 0.5, 4.0]);
        let mut pivots = Vec::new();
        band.factorize(&mut pivots).unwrap();
        assert!(pivots.iter().enumerate().any(|(j, &p)| p != j));
        let mut x = b.clone();
        band.solve(&pivots, &mut x);
        let residual = &dense * &x - &b;
        assert!(residual.norm() < 1e-12, "residual {}", residual.norm());
    }

    #[test]
    fn test_band_lu_wide_band() {
        let dense = DMatrix::from_fn(6, 6, |i, j| {
            let d = i as f64 - j as f64;
            if d.abs() <= 2.0 { 1.0 / (1.0 + d * d + i as f64) } else { 0.0 }
        });
        let mut band = BandMatrix::from_dense(&dense, 2, 2);
        let b = DVector::from_fn(6, |i, _| (i as f64).sin() + 1.0);
        let mut pivots = Vec::new();
        band.factorize(&mut pivots).unwrap();
        let mut x = b.clone();
        band.solve(&pivots, &mut x);
        let expected = dense.lu().solve(&b).unwrap();
        for i in 0..6 {
            assert_relative_eq!(x[i], expected[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_band_mul_and_identity_minus_scaled() {
        let dense = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 0.0, 3.0, 4.0, 5.0, 0.0, 6.0, 7.0]);
        let band = BandMatrix::from_dense(&dense, 1, 1);
        let x = DVector::from_vec(vec![1.0, -1.0, 2.0]);
        let mut out = DVector::zeros(3);
        band.mul_vec(&x, &mut out);
        assert_eq!(out, &dense * &x);
        let m = band.identity_minus_scaled(0.5);
        assert_eq!(m.get(0, 0), 0.5);
        assert_eq!(m.get(1, 2), -2.5);
        assert_eq!(m.get(0, 2), 0.0);
        assert_eq!(band.diagonal(), DVector::from_vec(vec![1.0, 4.0, 7.0]));
    }

    #[test]
    fn test_singular_band_matrix() {
        let mut band = BandMatrix::new(3, 1, 1);
        band.set(0, 0, 1.0);
        band.set(1, 0, 1.0);
        band.set(0, 1, 2.0);
        band.set(1, 1, 2.0);
        band.set(2, 2, 1.0);
        let mut pivots = Vec::new();
        assert!(matches!(
            band.factorize(&mut pivots),
            Err(SplitError::SingularMatrix { column: 1 })
        ));
    }

    #[test]
    #[should_panic]
    fn test_set_outside_band_panics() {
        let mut band = BandMatrix::new(4, 1, 0);
        band.set(2, 0, 1.0);
    }
}
