//! Demonstration drivers for the splitting core.
//!
//! | task | what it does |
//! |------|--------------|
//! | 0 | one split cycle on a small planar grid: explicit convection, then the QSS reaction sub-step on all nodes in parallel, started from the convected state with the convective diagonal as linear correction |
//! | 1 | linearized reaction sub-step at a single point with the banded implicit stepper |
//! | 2 | QSS reaction sub-step at a single point, options read from JSON |
//! | 3 | as task 0 with the linearized reaction sub-step and finite-difference Jacobians |
use crate::Chemistry::mechanisms::toy_flame_mechanism;
use crate::Convection::convection_system::ConvectionSystem;
use crate::Integrators::bdf_integrator::BdfIntegrator;
use crate::Integrators::explicit_integrator::ExplicitIntegrator;
use crate::Integrators::integrator::Integrator;
use crate::SourceTerms::linearized_source::LinearizedSource;
use crate::SourceTerms::parallel_points::{integrate_linearized_points, integrate_qss_points};
use crate::SourceTerms::source_system::SourceSystem;
use crate::SourceTerms::source_system_qss::SourceSystemQss;
use crate::errors::SplitError;
use crate::grid::{Geometry, Grid};
use crate::settings::{ChemistryIntegrator, ConfigOptions};
use crate::strain_function::StrainFunction;
use log::{error, info};
use nalgebra::{DMatrix, DVector};
use std::io;

const N_POINTS: usize = 8;
/// unburned-side composition of the toy mechanism (A, B, N)
const Y_FRESH: [f64; 3] = [0.5, 0.02, 0.48];

pub fn splitting_examples(task: usize) {
    let result = match task {
        0 => split_cycle_on_grid(&ConfigOptions::default()).map(|_| ()),
        1 => linearized_point(),
        2 => qss_point(),
        3 => ConfigOptions::from_json_str(
            r#"{ "chemistry_integrator": "Linearized", "fd_jacobian": true }"#,
        )
        .and_then(|options| split_cycle_on_grid(&options))
        .map(|_| ()),
        _ => {
            error!("unknown example task {}", task);
            Ok(())
        }
    };
    if let Err(e) = result {
        error!("example {} failed: {}", task, e);
    }
}

/// One split cycle; returns the whole-grid state `[U, T, Y..]` per node at
/// the end of the cycle.
pub(crate) fn split_cycle_on_grid(options: &ConfigOptions) -> Result<DVector<f64>, SplitError> {
    let gas = toy_flame_mechanism(options.pressure);
    let grid = Grid::uniform(0.0, 0.01, N_POINTS, Geometry::Planar)?;
    let dt = options.global_timestep;
    let strain = StrainFunction::constant(100.0);

    // temperature ramp from the fresh side to the hot side
    let t_profile: Vec<f64> = (0..N_POINTS)
        .map(|j| 1000.0 + 600.0 * j as f64 / (N_POINTS - 1) as f64)
        .collect();

    // convection sub-step
    let mut conv_gas = gas.clone();
    let mut convection = ConvectionSystem::new(&grid, &mut conv_gas);
    convection.set_left_boundary(1000.0, &Y_FRESH)?;
    convection.rVzero = 0.05;
    for j in 0..N_POINTS {
        convection.U[j] = 100.0;
        convection.T[j] = t_profile[j];
        for k in 0..Y_FRESH.len() {
            convection.Y[(k, j)] = Y_FRESH[k];
        }
    }
    let mut y0 = DVector::zeros(0);
    convection.roll_y(&mut y0);
    let n_vars = convection.n_vars();

    let mut integ = ExplicitIntegrator::new(&mut convection);
    integ.set_y0(&y0)?;
    integ.initialize(0.0, dt / 20.0)?;
    integ.integrate_to_time(dt)?;
    info!("convection sub-step reached t = {:e}", integ.get_t());
    let y_conv = integ.get_y().clone();
    drop(integ);

    // diagonal of the convective Jacobian at the convected state
    convection.unroll_y(&y_conv)?;
    let mut dU = DVector::zeros(N_POINTS);
    let mut dT = DVector::zeros(N_POINTS);
    let mut dY = DMatrix::zeros(n_vars - 2, N_POINTS);
    convection.get_diagonal(dt, &mut dU, &mut dT, &mut dY)?;
    let rho = convection.density().clone();
    info!("densities after convection: {:?}", rho.as_slice());

    // Reaction sub-step from the convected state. Convection enters as the
    // linear correction diag * (y - y_conv), zero at the start of the sub-step.
    let node_linear = |j: usize| {
        let mut lin = DVector::zeros(n_vars);
        lin[0] = dU[j];
        lin[1] = dT[j];
        for k in 0..n_vars - 2 {
            lin[2 + k] = dY[(k, j)];
        }
        lin
    };
    let mut y_end = y_conv.clone();
    match options.chemistry_integrator {
        ChemistryIntegrator::Qss => {
            let mut points = Vec::with_capacity(N_POINTS);
            for j in 0..N_POINTS {
                let mut point = SourceSystemQss::for_provider(&gas, options);
                point.j = j;
                point.x = grid.x[j];
                point.rhou = rho[0];
                point.strain_function = strain;
                let node = y_conv.rows(j * n_vars, n_vars).into_owned();
                let lin = node_linear(j);
                let sc = -lin.component_mul(&node);
                let sc_y = sc.rows(2, n_vars - 2).into_owned();
                point.set_split_constants(sc[0], sc[1], &sc_y)?;
                point.set_split_linear(&lin)?;
                let y = node.rows(2, n_vars - 2).into_owned();
                point.set_state(0.0, node[0], node[1], &y)?;
                points.push(point);
            }
            integrate_qss_points(&mut points, &gas, dt)?;

            let mut out = io::stdout();
            let mut node = DVector::zeros(n_vars);
            for (j, point) in points.iter_mut().enumerate() {
                point.write_state(&mut out, j == 0)?;
                point.finish_cycle();
                point.roll_y(&mut node);
                y_end.rows_mut(j * n_vars, n_vars).copy_from(&node);
            }
        }
        ChemistryIntegrator::Linearized => {
            let mut points = Vec::with_capacity(N_POINTS);
            for j in 0..N_POINTS {
                let mut system = SourceSystem::for_provider(&gas);
                system.j = j;
                system.x = grid.x[j];
                system.rhou = rho[0];
                system.strain_function = strain;
                let node = y_conv.rows(j * n_vars, n_vars).into_owned();
                let lin = node_linear(j);
                system.set_split_constants(&(-lin.component_mul(&node)))?;
                system.set_split_linear(&lin)?;
                points.push((system, node));
            }
            integrate_linearized_points(&mut points, &gas, 0.0, dt, dt / 5.0, options.fd_jacobian)?;

            let mut out = io::stdout();
            for (j, (system, y)) in points.iter_mut().enumerate() {
                system.unroll_y(y)?;
                system.write_state(&mut out, j == 0)?;
                system.finish_cycle();
                y_end.rows_mut(j * n_vars, n_vars).copy_from(y);
            }
        }
    }
    Ok(y_end)
}

fn linearized_point() -> Result<(), SplitError> {
    let options = ConfigOptions::default();
    let mut gas = toy_flame_mechanism(options.pressure);
    let mut system = SourceSystem::for_provider(&gas);
    system.rhou = 1.0;
    system.strain_function = StrainFunction::new(100.0, 200.0, 0.0, 1e-3);
    system.reset_split_constants();

    let y0 = DVector::from_row_slice(&[100.0, 1450.0, 0.4, 0.2, 0.4]);
    let n = y0.len();
    let mut source = LinearizedSource::new(&mut system, &mut gas, &y0, options.fd_jacobian);
    let bw = source.bandwidth();
    let mut integ = BdfIntegrator::new(&mut source);
    integ.resize(n, bw, bw);
    integ.set_y0(&y0)?;
    integ.initialize(0.0, options.global_timestep / 5.0)?;
    integ.integrate_to_time(options.global_timestep)?;
    let y1 = integ.get_y().clone();
    info!(
        "linearized step: U = {:e}, T = {:e}, Y = {:?}",
        y1[0],
        y1[1],
        &y1.as_slice()[2..]
    );
    drop(integ);

    let mut jac = DMatrix::zeros(n, n);
    system.dense_jacobian(&mut gas, options.global_timestep, &y1, &mut jac)?;
    let mut out = io::stdout();
    system.write_state(&mut out, true)?;
    system.write_jacobian(&jac, &mut out)?;
    system.finish_cycle();
    Ok(())
}

fn qss_point() -> Result<(), SplitError> {
    let options = ConfigOptions::from_json_str(
        r#"{ "qss_eps_min": 1e-3, "qss_dt_max": 1e-5, "qss_stability_check": true }"#,
    )?;
    let mut gas = toy_flame_mechanism(options.pressure);
    let mut point = SourceSystemQss::for_provider(&gas, &options);
    point.rhou = 1.0;
    point.reset_split_constants();
    point.set_state(0.0, 0.0, 1400.0, &DVector::from_row_slice(&Y_FRESH))?;
    let tf = 1e-3;
    point.integrate_to_time(&mut gas, tf)?;
    let integ = point.integrator();
    info!(
        "QSS point: {} evaluations, {} rejected steps, T = {:.2} K, rho = {:.4}, Wmx = {:.3}",
        integ.gcount,
        integ.rcount,
        point.T,
        point.density(),
        point.mixture_molecular_weight()
    );
    point.write_state(&mut io::stdout(), true)?;
    Ok(())
}
