//! Parallel map of the reaction sub-step over grid nodes.
//!
//! Point systems of distinct nodes are independent once the split constants
//! are fixed. The chemistry provider keeps the last installed state, so every
//! worker gets its own clone; the caller's provider is never touched.
use super::linearized_source::LinearizedSource;
use super::source_system::SourceSystem;
use super::source_system_qss::SourceSystemQss;
use crate::Chemistry::chemistry_api::ChemistryProvider;
use crate::Integrators::bdf_integrator::BdfIntegrator;
use crate::Integrators::integrator::Integrator;
use crate::errors::SplitError;
use log::debug;
use nalgebra::DVector;
use rayon::prelude::*;

/// below this number of nodes the map runs on the calling thread
pub const MIN_PARALLEL_POINTS: usize = 4;

fn wrap(point: usize, e: SplitError) -> SplitError {
    SplitError::PointFailure {
        point,
        source: Box::new(e),
    }
}

/// Applies `op(j, point_j, provider)` to every point. The first failure is
/// returned as `PointFailure` with the node index.
pub fn par_map_points<S, G, F>(points: &mut [S], gas: &G, op: F) -> Result<(), SplitError>
where
    S: Send,
    G: ChemistryProvider + Clone + Send + Sync,
    F: Fn(usize, &mut S, &mut G) -> Result<(), SplitError> + Send + Sync,
{
    if points.len() < MIN_PARALLEL_POINTS {
        let mut worker_gas = gas.clone();
        for (j, point) in points.iter_mut().enumerate() {
            op(j, point, &mut worker_gas).map_err(|e| wrap(j, e))?;
        }
        return Ok(());
    }
    debug!(
        "reaction sub-step on {} points, {} threads",
        points.len(),
        rayon::current_num_threads()
    );
    points
        .par_iter_mut()
        .enumerate()
        .try_for_each_init(
            || gas.clone(),
            |worker_gas, (j, point)| op(j, point, worker_gas).map_err(|e| wrap(j, e)),
        )
}

/// QSS reaction sub-step: every point is integrated from its installed
/// state to `tf`.
pub fn integrate_qss_points<G>(points: &mut [SourceSystemQss], gas: &G, tf: f64) -> Result<(), SplitError>
where
    G: ChemistryProvider + Clone + Send + Sync,
{
    par_map_points(points, gas, |_, point, worker_gas| {
        point.integrate_to_time(worker_gas, tf)
    })
}

/// Linearized reaction sub-step: every `(system, y)` pair is advanced from
/// `t0` to `tf` with the banded implicit stepper and step `h`; `y` holds the
/// result afterwards.
pub fn integrate_linearized_points<G>(
    points: &mut [(SourceSystem, DVector<f64>)],
    gas: &G,
    t0: f64,
    tf: f64,
    h: f64,
    use_fd: bool,
) -> Result<(), SplitError>
where
    G: ChemistryProvider + Clone + Send + Sync,
{
    par_map_points(points, gas, |_, point, worker_gas| {
        let (system, y) = point;
        let n = y.len();
        let mut source = LinearizedSource::new(system, worker_gas, y, use_fd);
        let bw = source.bandwidth();
        let mut integ = BdfIntegrator::new(&mut source);
        integ.resize(n, bw, bw);
        integ.set_y0(y)?;
        integ.initialize(t0, h)?;
        integ.integrate_to_time(tf)?;
        let y_end = integ.get_y().clone();
        y.copy_from(&y_end);
        Ok(())
    })
}
