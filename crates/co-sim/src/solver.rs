//! Continuous-state solvers for the Model Exchange loop.
//!
//! A solver advances the continuous states of an instance in continuous-time
//! mode from `t` towards `t_next` and reports sign changes of the event
//! indicators. On return the instance holds the states at the returned time.

use crate::error::SimResult;
use crate::input::InputSignal;
use co_model::ModelInstance;
use serde::{Deserialize, Serialize};

pub mod bdf;
pub mod euler;
pub mod roots;

pub use bdf::{BdfOptions, BdfSolver};
pub use euler::ForwardEuler;

/// Outcome of one [`Solver::step`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverStep {
    /// Whether any event indicator changed sign.
    pub state_event: bool,
    /// Per indicator: `1` rising, `-1` falling, `0` none. Empty without a
    /// state event.
    pub roots: Vec<i32>,
    /// Time actually reached, `<= t_next`.
    pub time: f64,
}

/// Trait for continuous-state solvers.
pub trait Solver {
    /// Advance from `t` to `t_next`, stopping early at a localized state event.
    fn step<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        t: f64,
        t_next: f64,
    ) -> SimResult<SolverStep>;

    /// Discard history after the states changed discontinuously at `time`.
    fn reset<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
    ) -> SimResult<()>;

    /// Whether the solver only steps on a fixed grid.
    fn is_fixed_step(&self) -> bool;
}

/// Solver selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Explicit Euler on a fixed step, no root refinement.
    Euler,
    /// Adaptive variable-order BDF with root localization.
    #[default]
    Bdf,
}

/// Solver chosen for one run.
#[derive(Debug)]
pub enum ActiveSolver {
    Euler(ForwardEuler),
    Bdf(Box<BdfSolver>),
}

impl Solver for ActiveSolver {
    fn step<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        t: f64,
        t_next: f64,
    ) -> SimResult<SolverStep> {
        match self {
            ActiveSolver::Euler(s) => s.step(instance, input, t, t_next),
            ActiveSolver::Bdf(s) => s.step(instance, input, t, t_next),
        }
    }

    fn reset<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
    ) -> SimResult<()> {
        match self {
            ActiveSolver::Euler(s) => s.reset(instance, input, time),
            ActiveSolver::Bdf(s) => s.reset(instance, input, time),
        }
    }

    fn is_fixed_step(&self) -> bool {
        matches!(self, ActiveSolver::Euler(_))
    }
}

/// Sign change of one indicator between two samples.
pub(crate) fn root_direction(before: f64, after: f64) -> i32 {
    if before < 0.0 && after >= 0.0 {
        1
    } else if before > 0.0 && after <= 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_directions() {
        assert_eq!(root_direction(-1.0, 0.0), 1);
        assert_eq!(root_direction(-1.0, 2.0), 1);
        assert_eq!(root_direction(1.0, 0.0), -1);
        assert_eq!(root_direction(1.0, -2.0), -1);
        assert_eq!(root_direction(0.0, 1.0), 0);
        assert_eq!(root_direction(0.0, -1.0), 0);
        assert_eq!(root_direction(1.0, 2.0), 0);
    }

    #[test]
    fn bdf_is_the_default_solver() {
        assert_eq!(SolverKind::default(), SolverKind::Bdf);
    }
}
