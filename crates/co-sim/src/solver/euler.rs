//! Explicit Euler on the caller's grid.

use super::{Solver, SolverStep, root_direction};
use crate::error::SimResult;
use crate::input::InputSignal;
use co_model::ModelInstance;

/// Forward Euler (explicit, 1st order).
///
/// Sign changes of the event indicators are detected by comparing the values
/// before and after the step. The crossing time is not refined: the event is
/// reported at the end of the step.
#[derive(Clone, Debug, Default)]
pub struct ForwardEuler {
    x: Vec<f64>,
    dx: Vec<f64>,
    z: Vec<f64>,
    pre_z: Vec<f64>,
    roots: Vec<i32>,
}

impl ForwardEuler {
    /// Pre-size the buffers and read the current event indicators.
    pub fn new<I: ModelInstance + ?Sized>(instance: &mut I) -> SimResult<Self> {
        let nx = instance.number_of_continuous_states();
        let nz = instance.number_of_event_indicators();
        let mut solver = Self {
            x: vec![0.0; nx],
            dx: vec![0.0; nx],
            z: vec![0.0; nz],
            pre_z: vec![0.0; nz],
            roots: vec![0; nz],
        };
        if nz > 0 {
            instance.get_event_indicators(&mut solver.pre_z)?;
        }
        Ok(solver)
    }
}

impl Solver for ForwardEuler {
    fn step<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        _input: &mut InputSignal,
        t: f64,
        t_next: f64,
    ) -> SimResult<SolverStep> {
        if !self.x.is_empty() {
            instance.get_continuous_states(&mut self.x)?;
            instance.get_derivatives(&mut self.dx)?;
            let h = t_next - t;
            for (x, dx) in self.x.iter_mut().zip(&self.dx) {
                *x += h * dx;
            }
        }

        instance.set_time(t_next)?;
        if !self.x.is_empty() {
            instance.set_continuous_states(&self.x)?;
        }

        if !self.z.is_empty() {
            instance.get_event_indicators(&mut self.z)?;
            for ((root, &before), &after) in self.roots.iter_mut().zip(&self.pre_z).zip(&self.z) {
                *root = root_direction(before, after);
            }
            self.pre_z.copy_from_slice(&self.z);
        }

        let state_event = self.roots.iter().any(|&r| r != 0);
        tracing::trace!(t, t_next, state_event, "euler step");
        Ok(SolverStep {
            state_event,
            roots: if state_event { self.roots.clone() } else { Vec::new() },
            time: t_next,
        })
    }

    fn reset<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        _input: &mut InputSignal,
        _time: f64,
    ) -> SimResult<()> {
        if !self.pre_z.is_empty() {
            instance.get_event_indicators(&mut self.pre_z)?;
        }
        Ok(())
    }

    fn is_fixed_step(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::iterate_discrete_states;
    use co_model::{InstanceConfig, InterfaceType, LogSink};
    use co_reference::{BouncingBall, ReferenceFactory};

    #[test]
    fn reports_roots_only_at_the_crossing() {
        let config = InstanceConfig::new("ball", InterfaceType::ModelExchange)
            .with_log_sink(LogSink::Discard);
        let mut instance = ReferenceFactory::<BouncingBall>::new()
            .instantiate_reference(config)
            .unwrap();
        instance.enter_initialization_mode(None, 0.0, Some(1.0)).unwrap();
        instance.exit_initialization_mode().unwrap();
        iterate_discrete_states(&mut instance).unwrap();
        instance.enter_continuous_time_mode().unwrap();

        let mut solver = ForwardEuler::new(&mut instance).unwrap();
        assert!(solver.is_fixed_step());
        let mut input = InputSignal::none();
        let mut t = 0.0;
        let step = loop {
            let step = solver.step(&mut instance, &mut input, t, t + 0.01).unwrap();
            t = step.time;
            if step.state_event || t > 1.0 {
                break step;
            }
            assert!(step.roots.is_empty());
        };
        assert!(step.state_event);
        assert_eq!(step.roots, [-1]);
        assert!((t - 0.46).abs() < 0.015, "t = {t}");
        assert_eq!(solver.roots.len(), 1);
    }
}
