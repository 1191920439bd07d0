#[cfg(test)]
mod tests {
    use super::super::splitting_examples::*;
    use crate::settings::{ChemistryIntegrator, ConfigOptions};
    use approx::assert_relative_eq;

    const N_VARS: usize = 5;

    fn cycle(integrator: ChemistryIntegrator) -> nalgebra::DVector<f64> {
        let options = ConfigOptions {
            chemistry_integrator: integrator,
            ..ConfigOptions::default()
        };
        split_cycle_on_grid(&options).unwrap()
    }

    #[test]
    fn test_split_cycle_recombines_both_sub_steps() {
        let qss = cycle(ChemistryIntegrator::Qss);
        let linearized = cycle(ChemistryIntegrator::Linearized);
        assert_eq!(qss.len(), 8 * N_VARS);
        assert_eq!(linearized.len(), qss.len());
        assert!(qss.iter().chain(linearized.iter()).all(|v| v.is_finite()));

        // hot end: the reaction heats the convected state and consumes A
        let hot = 7 * N_VARS;
        assert!(qss[hot + 1] > 1600.0, "T = {}", qss[hot + 1]);
        assert!(qss[hot + 2] < 0.5);
        // both reaction integrators advance the same corrected equations
        for j in 0..8 {
            assert_relative_eq!(
                qss[j * N_VARS + 1],
                linearized[j * N_VARS + 1],
                max_relative = 3e-2
            );
        }
    }
}
