#[cfg(test)]
mod tests {
    use super::super::linearized_source::LinearizedSource;
    use super::super::parallel_points::integrate_linearized_points;
    use super::super::source_system::*;
    use crate::Chemistry::chemistry_api::ChemistryProvider;
    use crate::Chemistry::ideal_gas::IdealGasMixture;
    use crate::Chemistry::mechanisms::{inert_mixture, toy_flame_mechanism};
    use crate::Integrators::bdf_integrator::BdfIntegrator;
    use crate::Integrators::integrator::Integrator;
    use crate::errors::SplitError;
    use crate::strain_function::StrainFunction;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    fn state(u: f64, t: f64, y: &[f64]) -> DVector<f64> {
        let mut v = vec![u, t];
        v.extend_from_slice(y);
        DVector::from_vec(v)
    }

    fn reacting_system(gas: &IdealGasMixture) -> SourceSystem {
        let mut system = SourceSystem::for_provider(gas);
        system.rhou = 1.2;
        system.strain_function = StrainFunction::new(100.0, 300.0, 0.0, 1e-2);
        system.j = 3;
        system.x = 2.5e-3;
        system
    }

    #[test]
    fn test_shapes_and_roll() {
        let gas = toy_flame_mechanism(101325.0);
        let mut system = SourceSystem::for_provider(&gas);
        assert_eq!(system.n_spec(), 3);
        assert_eq!(system.n_vars(), 5);
        assert_eq!(system.split_const.len(), 5);
        assert_eq!(system.W.as_slice(), gas.molecular_weights());
        let y = state(1.5, 900.0, &[0.2, 0.3, 0.5]);
        system.unroll_y(&y).unwrap();
        assert_eq!(system.T, 900.0);
        assert_eq!(system.Y[1], 0.3);
        let mut rolled = DVector::zeros(0);
        system.roll_y(&mut rolled);
        assert_eq!(rolled, y);
        system.resize(2);
        assert_eq!(system.n_vars(), 4);
        assert_eq!(system.Y.len(), 2);
        assert!(matches!(
            system.unroll_y(&y),
            Err(SplitError::DimensionMismatch { expected: 4, got: 5, .. })
        ));
    }

    #[test]
    fn test_rhs_formulas() {
        let mut gas = toy_flame_mechanism(101325.0);
        let mut system = reacting_system(&gas);
        let sc = DVector::from_vec(vec![1.0, -2.0, 0.5, 0.0, -0.5]);
        system.set_split_constants(&sc).unwrap();
        let y = state(20.0, 1200.0, &[0.3, 0.2, 0.5]);
        let t = 5e-3;
        let mut ydot = DVector::zeros(5);
        system.f(&mut gas, t, &y, &mut ydot).unwrap();

        let rho = gas.density();
        let cp = gas.cp_mass();
        let mut wdot = vec![0.0; 3];
        gas.net_production_rates(&mut wdot).unwrap();
        let mut hk = vec![0.0; 3];
        gas.enthalpies(&mut hk);
        let qdot: f64 = -(0..3).map(|k| wdot[k] * hk[k]).sum::<f64>();
        // middle of the ramp: a = 200, dadt = 2e4
        let strain = 2.0e4 + 200.0 * 200.0;
        assert_relative_eq!(ydot[0], -400.0 + 1.2 / rho * strain + 1.0, max_relative = 1e-12);
        assert_relative_eq!(ydot[1], qdot / (rho * cp) - 2.0, max_relative = 1e-12);
        for k in 0..3 {
            assert_relative_eq!(
                ydot[2 + k],
                wdot[k] * gas.molecular_weights()[k] / rho + sc[2 + k],
                max_relative = 1e-12
            );
        }
        assert_relative_eq!(system.qdot, qdot, max_relative = 1e-12);
        assert_relative_eq!(system.density(), rho);
        // exothermic: products have lower enthalpy
        assert!(qdot > 0.0);
    }

    #[test]
    fn test_zero_forcing_gives_zero_derivative() {
        let mut gas = inert_mixture(101325.0);
        let mut system = SourceSystem::for_provider(&gas);
        system.reset_split_constants();
        let y = state(0.0, 1500.0, &[0.1, 0.2, 0.7]);
        let mut ydot = DVector::from_element(5, 1.0);
        system.f(&mut gas, 0.0, &y, &mut ydot).unwrap();
        for v in ydot.iter() {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn test_analytic_and_fd_jacobians_agree() {
        let mut gas = toy_flame_mechanism(101325.0);
        let mut system = reacting_system(&gas);
        system.update_diagonal_jac = true;
        system.set_split_constants(&DVector::from_vec(vec![3.0, 1e4, -1.0, 2.0, 0.0]))
            .unwrap();
        let y = state(15.0, 1300.0, &[0.35, 0.15, 0.5]);
        let t = 2e-3;
        let mut ydot = DVector::zeros(5);
        system.f(&mut gas, t, &y, &mut ydot).unwrap();
        let mut j_dense = DMatrix::zeros(5, 5);
        system.dense_jacobian(&mut gas, t, &y, &mut j_dense).unwrap();
        let mut j_fd = DMatrix::zeros(5, 5);
        system.fd_jacobian(&mut gas, t, &y, &ydot, &mut j_fd).unwrap();

        for i in 0..5 {
            let row_scale = j_dense.row(i).amax().max(1e-12);
            for k in 0..5 {
                let diff = (j_dense[(i, k)] - j_fd[(i, k)]).abs();
                assert!(
                    diff <= 1e-3 * j_dense[(i, k)].abs() + 1e-4 * row_scale,
                    "J[{}, {}]: analytic {} fd {}",
                    i,
                    k,
                    j_dense[(i, k)],
                    j_fd[(i, k)]
                );
            }
        }
        assert_eq!(system.diagonal_jac, j_dense.diagonal());
        // the system is left at the evaluation state
        let mut rolled = DVector::zeros(0);
        system.roll_y(&mut rolled);
        assert_eq!(rolled, y);
        let mut ydot_after = DVector::zeros(0);
        system.roll_ydot(&mut ydot_after);
        assert_eq!(ydot_after, ydot);
    }

    #[test]
    fn test_velocity_jacobian_entries() {
        let mut gas = inert_mixture(101325.0);
        let mut system = SourceSystem::for_provider(&gas);
        system.rhou = 0.8;
        system.strain_function = StrainFunction::constant(50.0);
        system.reset_split_constants();
        let y = state(4.0, 1000.0, &[0.3, 0.3, 0.4]);
        let mut jac = DMatrix::zeros(0, 0);
        system.dense_jacobian(&mut gas, 0.0, &y, &mut jac).unwrap();
        assert_eq!(jac.shape(), (5, 5));
        let rho = system.density();
        assert_eq!(jac[(0, 0)], -8.0);
        assert_relative_eq!(jac[(0, 1)], 0.8 * 2500.0 / (rho * 1000.0), max_relative = 1e-12);
        // no reactions: the temperature and species rows vanish
        for i in 1..5 {
            for k in 0..5 {
                assert_eq!(jac[(i, k)], 0.0);
            }
        }
    }

    #[test]
    fn test_split_constants_must_be_reset() {
        let mut gas = inert_mixture(101325.0);
        let mut system = SourceSystem::for_provider(&gas);
        let y = state(0.0, 1000.0, &[0.2, 0.2, 0.6]);
        let mut ydot = DVector::zeros(5);
        assert!(matches!(
            system.f(&mut gas, 0.0, &y, &mut ydot),
            Err(SplitError::SplitConstantsNotReset)
        ));

        // cycle 1 with non-zero constants
        let sc = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        system.set_split_constants(&sc).unwrap();
        system.f(&mut gas, 0.0, &y, &mut ydot).unwrap();
        assert_eq!(ydot, sc);
        system.finish_cycle();
        assert!(!system.split_constants_ready());
        assert!(matches!(
            system.f(&mut gas, 0.0, &y, &mut ydot),
            Err(SplitError::SplitConstantsNotReset)
        ));

        // cycle 2: nothing of cycle 1 survives the reset
        system.reset_split_constants();
        system.f(&mut gas, 0.0, &y, &mut ydot).unwrap();
        assert_eq!(ydot, DVector::zeros(5));

        system.resize(3);
        system.W.copy_from_slice(gas.molecular_weights());
        assert!(matches!(
            system.f(&mut gas, 0.0, &y, &mut ydot),
            Err(SplitError::SplitConstantsNotReset)
        ));
        assert!(system.set_split_constants(&DVector::zeros(4)).is_err());
    }

    #[test]
    fn test_provider_mismatch_and_invalid_state() {
        let mut gas = inert_mixture(101325.0);
        let mut system = SourceSystem::new(2);
        system.reset_split_constants();
        let y = state(0.0, 1000.0, &[0.5, 0.5]);
        let mut ydot = DVector::zeros(4);
        assert!(matches!(
            system.f(&mut gas, 0.0, &y, &mut ydot),
            Err(SplitError::DimensionMismatch { .. })
        ));

        let mut system = SourceSystem::for_provider(&gas);
        system.reset_split_constants();
        let y = state(0.0, f64::NAN, &[0.5, 0.5, 0.0]);
        let mut ydot = DVector::zeros(5);
        assert!(matches!(
            system.f(&mut gas, 0.0, &y, &mut ydot),
            Err(SplitError::Chemistry(_))
        ));
    }

    #[test]
    fn test_diagnostics_do_not_change_numerics() {
        let mut gas = toy_flame_mechanism(101325.0);
        let mut system = reacting_system(&gas);
        system.reset_split_constants();
        let y = state(10.0, 1250.0, &[0.4, 0.1, 0.5]);
        let mut ydot = DVector::zeros(5);
        system.f(&mut gas, 0.0, &y, &mut ydot).unwrap();
        let mut jac = DMatrix::zeros(5, 5);
        system.dense_jacobian(&mut gas, 0.0, &y, &mut jac).unwrap();

        let mut out: Vec<u8> = Vec::new();
        system.write_state(&mut out, true).unwrap();
        system.write_state(&mut out, false).unwrap();
        system.write_jacobian(&jac, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("dTdt"));
        assert!(text.contains("Y2"));
        assert!(text.contains("d/d"));

        let mut ydot_again = DVector::zeros(5);
        system.f(&mut gas, 0.0, &y, &mut ydot_again).unwrap();
        assert_eq!(ydot, ydot_again);
    }

    #[test]
    fn test_linearized_step_matches_backward_euler() {
        // inert gas: only dU/dt = -U² and the split constant on T remain
        let mut gas = inert_mixture(101325.0);
        let mut system = SourceSystem::for_provider(&gas);
        let mut sc = DVector::zeros(5);
        sc[1] = 1000.0;
        system.set_split_constants(&sc).unwrap();
        let (u0, h) = (4.0, 0.01);
        let y0 = state(u0, 800.0, &[0.25, 0.25, 0.5]);
        let n = y0.len();
        let mut source = LinearizedSource::new(&mut system, &mut gas, &y0, false);
        let bw = source.bandwidth();
        assert_eq!(bw, 4);
        let mut integ = BdfIntegrator::new(&mut source);
        integ.resize(n, bw, bw);
        integ.set_y0(&y0).unwrap();
        integ.initialize(0.0, h).unwrap();
        integ.step().unwrap();
        let y1 = integ.get_y();
        assert_relative_eq!(y1[0], (u0 + h * u0 * u0) / (1.0 + 2.0 * h * u0), max_relative = 1e-12);
        assert_relative_eq!(y1[1], 800.0 + h * 1000.0, max_relative = 1e-12);
        for k in 2..n {
            assert_relative_eq!(y1[k], y0[k], max_relative = 1e-12);
        }
        assert_relative_eq!(integ.get_diagonal()[0], -2.0 * u0);
    }

    #[test]
    fn test_split_linear_enters_rhs_and_jacobian_diagonal() {
        let mut gas = inert_mixture(101325.0);
        let mut system = SourceSystem::for_provider(&gas);
        system.reset_split_constants();
        let lin = DVector::from_vec(vec![-3.0, -400.0, -50.0, 0.0, 20.0]);
        system.set_split_linear(&lin).unwrap();
        assert!(matches!(
            system.set_split_linear(&DVector::zeros(3)),
            Err(SplitError::DimensionMismatch { expected: 5, got: 3, .. })
        ));
        let y = state(2.0, 1500.0, &[0.1, 0.2, 0.7]);
        let mut ydot = DVector::zeros(5);
        system.f(&mut gas, 0.0, &y, &mut ydot).unwrap();
        assert_relative_eq!(ydot[0], -4.0 - 6.0);
        assert_relative_eq!(ydot[1], -400.0 * 1500.0);
        assert_relative_eq!(ydot[2], -5.0, max_relative = 1e-14);
        assert_eq!(ydot[3], 0.0);
        assert_relative_eq!(ydot[4], 14.0, max_relative = 1e-14);

        let mut jac = DMatrix::zeros(5, 5);
        system.dense_jacobian(&mut gas, 0.0, &y, &mut jac).unwrap();
        assert_relative_eq!(jac[(0, 0)], -2.0 * 2.0 - 3.0);
        for i in 1..5 {
            assert_relative_eq!(jac[(i, i)], lin[i], epsilon = 1e-9);
        }
        let mut fd = DMatrix::zeros(5, 5);
        system.fd_jacobian(&mut gas, 0.0, &y, &ydot, &mut fd).unwrap();
        for i in 0..5 {
            assert_relative_eq!(fd[(i, i)], jac[(i, i)], max_relative = 1e-5, epsilon = 1e-6);
        }

        // a new cycle starts without the linear term
        system.reset_split_constants();
        assert_eq!(system.split_linear, DVector::zeros(5));
    }

    #[test]
    fn test_split_linear_reproduces_exponential_decay() {
        let mut gas = inert_mixture(101325.0);
        let mut system = SourceSystem::for_provider(&gas);
        system.reset_split_constants();
        system
            .set_split_linear(&DVector::from_vec(vec![0.0, -400.0, -50.0, 0.0, 20.0]))
            .unwrap();
        let y0 = state(0.0, 1500.0, &[0.1, 0.2, 0.7]);
        let tf = 2.5e-3;
        let mut source = LinearizedSource::new(&mut system, &mut gas, &y0, false);
        let bw = source.bandwidth();
        let mut integ = BdfIntegrator::new(&mut source);
        integ.resize(5, bw, bw);
        integ.set_y0(&y0).unwrap();
        integ.initialize(0.0, 1e-5).unwrap();
        integ.integrate_to_time(tf).unwrap();
        let y = integ.get_y();
        assert_eq!(y[0], 0.0);
        assert_relative_eq!(y[1], 1500.0 * (-1.0f64).exp(), max_relative = 1e-4);
        assert_relative_eq!(y[2], 0.1 * (-0.125f64).exp(), max_relative = 1e-4);
        assert_relative_eq!(y[3], 0.2, max_relative = 1e-12);
        assert_relative_eq!(y[4], 0.7 * (0.05f64).exp(), max_relative = 1e-4);
    }

    #[test]
    fn test_linearized_reaction_step_follows_rhs() {
        let mut gas = toy_flame_mechanism(101325.0);
        let mut system = reacting_system(&gas);
        system.reset_split_constants();
        let y0 = state(5.0, 1400.0, &[0.4, 0.1, 0.5]);
        let mut f0 = DVector::zeros(5);
        system.f(&mut gas, 0.0, &y0, &mut f0).unwrap();
        for use_fd in [false, true] {
            let h = 1e-9;
            let mut source = LinearizedSource::new(&mut system, &mut gas, &y0, use_fd);
            let mut integ = BdfIntegrator::new(&mut source);
            integ.resize(5, 4, 4);
            integ.set_y0(&y0).unwrap();
            integ.initialize(0.0, h).unwrap();
            integ.step().unwrap();
            let slope = (integ.get_y() - &y0) / h;
            for i in 0..5 {
                assert_relative_eq!(slope[i], f0[i], max_relative = 1e-3, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_parallel_linearized_points_match_single_point() {
        let gas = toy_flame_mechanism(101325.0);
        let temperatures = [1100.0, 1200.0, 1300.0, 1400.0, 1500.0];
        let (h, tf) = (1e-7, 5e-7);
        let mut points: Vec<(SourceSystem, DVector<f64>)> = temperatures
            .iter()
            .map(|&t| {
                let mut system = reacting_system(&gas);
                system.reset_split_constants();
                (system, state(5.0, t, &[0.4, 0.1, 0.5]))
            })
            .collect();
        integrate_linearized_points(&mut points, &gas, 0.0, tf, h, false).unwrap();

        let mut serial_gas = gas.clone();
        let mut system = reacting_system(&gas);
        system.reset_split_constants();
        let y0 = state(5.0, 1300.0, &[0.4, 0.1, 0.5]);
        let mut source = LinearizedSource::new(&mut system, &mut serial_gas, &y0, false);
        let mut integ = BdfIntegrator::new(&mut source);
        integ.resize(5, 4, 4);
        integ.set_y0(&y0).unwrap();
        integ.initialize(0.0, h).unwrap();
        integ.integrate_to_time(tf).unwrap();
        assert_eq!(integ.get_y(), &points[2].1);
        assert!(points[4].1[1] > 1500.0);
    }
}
