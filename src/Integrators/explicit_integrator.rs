//! Forward Euler integrator for non-stiff operators (convection).
//! Stability is the caller's responsibility through the choice of `h`.
use super::integrator::{Integrator, IntegratorState, Ode};
use crate::errors::{SplitError, check_len};
use log::debug;
use nalgebra::DVector;

pub struct ExplicitIntegrator<'a, O: Ode> {
    ode: &'a mut O,
    state: IntegratorState,
}

impl<'a, O: Ode> ExplicitIntegrator<'a, O> {
    pub fn new(ode: &'a mut O) -> Self {
        Self {
            ode,
            state: IntegratorState::new(0),
        }
    }

    pub fn ode(&self) -> &O {
        &*self.ode
    }

    pub fn ode_mut(&mut self) -> &mut O {
        &mut *self.ode
    }

    fn step_with(&mut self, h: f64) -> Result<(), SplitError> {
        let st = &mut self.state;
        self.ode.f(st.t, &st.y, &mut st.ydot)?;
        check_len("ExplicitIntegrator::step (ydot)", st.N, st.ydot.len())?;
        st.y.axpy(h, &st.ydot, 1.0);
        st.t += h;
        Ok(())
    }
}

impl<'a, O: Ode> Integrator for ExplicitIntegrator<'a, O> {
    fn set_y0(&mut self, y0: &DVector<f64>) -> Result<(), SplitError> {
        self.state.set_y0(y0);
        Ok(())
    }

    fn initialize(&mut self, t0: f64, h: f64) -> Result<(), SplitError> {
        self.state.initialize(t0, h)
    }

    fn get_t(&self) -> f64 {
        self.state.t
    }

    fn get_h(&self) -> f64 {
        self.state.h
    }

    fn get_y(&self) -> &DVector<f64> {
        &self.state.y
    }

    fn get_ydot(&mut self) -> Result<&DVector<f64>, SplitError> {
        self.state.require_initialized()?;
        let st = &mut self.state;
        self.ode.f(st.t, &st.y, &mut st.ydot)?;
        Ok(&self.state.ydot)
    }

    fn step(&mut self) -> Result<(), SplitError> {
        self.state.require_initialized()?;
        let h = self.state.h;
        self.step_with(h)
    }

    fn integrate_to_time(&mut self, t_end: f64) -> Result<(), SplitError> {
        self.state.require_initialized()?;
        self.state.check_end_time(t_end)?;
        let mut n_steps = 0;
        while let Some((h, last)) = self.state.next_step_size(t_end) {
            self.step_with(h)?;
            n_steps += 1;
            if last {
                break;
            }
        }
        self.state.t = t_end;
        debug!("explicit integration reached t = {:e} in {} steps", t_end, n_steps);
        Ok(())
    }
}
