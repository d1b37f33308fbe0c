//! Simulation options and their resolution against model defaults.

use crate::error::{SimError, SimResult};
use crate::input::InputTable;
use crate::solver::SolverKind;
use crate::start_values::StartValues;
use co_core::{auto_interval, coarsen_interval, default_step_size, ensure_positive};
use co_model::{InterfaceType, ModelDescription};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relative tolerance of Model Exchange runs when none is given.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-5;

/// Output samples a default interval is coarsened to.
const MAX_DEFAULT_SAMPLES: f64 = 1000.0;

/// Where a paused run left off.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub time: f64,
    /// Time event scheduled by the instance (Model Exchange).
    pub next_event_time: Option<f64>,
}

/// Options for simulation runs.
///
/// Unset fields fall back to the model's default experiment, then to
/// built-in defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    pub interface: InterfaceType,
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    /// Solver for Model Exchange (default: BDF)
    pub solver: SolverKind,
    /// Fixed step of the Euler solver
    pub step_size: Option<f64>,
    pub relative_tolerance: Option<f64>,
    /// Interval of the regular output grid
    pub output_interval: Option<f64>,
    /// Record rows before and after every event
    pub record_events: bool,
    /// Wall-clock timeout in seconds, checked between steps
    pub timeout: Option<f64>,
    /// Variables to record; `None` selects defaults
    pub output: Option<Vec<String>>,
    pub start_values: StartValues,
    /// Allow `do_step` to return before the communication point
    pub early_return_allowed: bool,
    /// Handle events of Co-Simulation instances in event mode
    pub use_event_mode: bool,
    /// Pass the stop time to `enter_initialization_mode`
    pub set_stop_time: bool,
    /// Push first-order input derivatives before each `do_step`
    pub set_input_derivatives: bool,
    /// Fail on start values that could not be applied
    pub validate: bool,
    /// Run the initialization sequence (off when resuming)
    pub initialize: bool,
    /// Call `terminate` at the end of the run
    pub terminate: bool,
    /// Log every call into the instance
    pub log_calls: bool,
    /// Continue a paused run
    pub resume: Option<ResumePoint>,
    /// Input signals; never serialized
    #[serde(skip)]
    pub input: Option<InputTable>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            interface: InterfaceType::ModelExchange,
            start_time: None,
            stop_time: None,
            solver: SolverKind::default(),
            step_size: None,
            relative_tolerance: None,
            output_interval: None,
            record_events: true,
            timeout: None,
            output: None,
            start_values: StartValues::new(),
            early_return_allowed: false,
            use_event_mode: false,
            set_stop_time: true,
            set_input_derivatives: false,
            validate: true,
            initialize: true,
            terminate: true,
            log_calls: false,
            resume: None,
            input: None,
        }
    }
}

/// Options with every default filled in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedOptions {
    pub start_time: f64,
    pub stop_time: f64,
    /// Time the run starts at: the start time or the resume time.
    pub initial_time: f64,
    pub step_size: f64,
    pub output_interval: f64,
    pub relative_tolerance: Option<f64>,
    pub timeout: Option<Duration>,
}

fn positive(value: Option<f64>, what: &'static str) -> SimResult<Option<f64>> {
    Ok(value.map(|v| ensure_positive(v, what)).transpose()?)
}

impl SimOptions {
    /// Fill unset fields from the model description.
    pub fn resolve(&self, description: &ModelDescription) -> SimResult<ResolvedOptions> {
        let experiment = description.default_experiment.unwrap_or_default();

        let start_time = self
            .start_time
            .or(experiment.start_time)
            .unwrap_or(0.0);
        let stop_time = self
            .stop_time
            .or(experiment.stop_time)
            .unwrap_or(start_time + 1.0);
        if !start_time.is_finite() || !stop_time.is_finite() {
            return Err(SimError::InvalidArg {
                what: "start and stop time must be finite",
            });
        }
        if stop_time <= start_time {
            return Err(SimError::InvalidArg {
                what: "stop time must be after start time",
            });
        }
        let span = stop_time - start_time;

        let step_size = positive(self.step_size, "step size must be positive")?
            .unwrap_or_else(|| default_step_size(span));
        let relative_tolerance = positive(
            self.relative_tolerance,
            "relative tolerance must be positive",
        )?
        .or(experiment.tolerance);

        let output_interval = match positive(self.output_interval, "output interval must be positive")? {
            Some(interval) => interval,
            None => match self.interface {
                InterfaceType::ModelExchange => {
                    coarsen_interval(step_size, span, MAX_DEFAULT_SAMPLES)
                }
                InterfaceType::CoSimulation => description
                    .co_simulation
                    .and_then(|cs| cs.fixed_internal_step_size)
                    .or(experiment.step_size)
                    .map(|h| coarsen_interval(h, span, MAX_DEFAULT_SAMPLES))
                    .unwrap_or_else(|| auto_interval(span)),
            },
        };

        let initial_time = match self.resume {
            Some(resume) => {
                if !(start_time..=stop_time).contains(&resume.time) {
                    return Err(SimError::InvalidArg {
                        what: "resume time must lie within the simulation span",
                    });
                }
                resume.time
            }
            None => start_time,
        };

        let timeout = positive(self.timeout, "timeout must be positive")?
            .map(Duration::from_secs_f64);

        Ok(ResolvedOptions {
            start_time,
            stop_time,
            initial_time,
            step_size,
            output_interval,
            relative_tolerance,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use co_reference::{BouncingBall, Feedthrough, ReferenceModel};

    #[test]
    fn defaults_from_experiment() {
        let description = BouncingBall::description();
        let resolved = SimOptions::default().resolve(&description).unwrap();
        assert_eq!(resolved.start_time, 0.0);
        assert_eq!(resolved.stop_time, 3.0);
        assert_eq!(resolved.initial_time, 0.0);
        assert!((resolved.step_size - 1e-3).abs() < 1e-15);
        // 3000 steps of 1e-3 coarsen to 750 samples
        assert!((resolved.output_interval - 4e-3).abs() < 1e-15);
        assert_eq!(resolved.relative_tolerance, None);
    }

    #[test]
    fn co_simulation_interval_from_fixed_step() {
        let description = Feedthrough::description();
        let options = SimOptions {
            interface: InterfaceType::CoSimulation,
            ..SimOptions::default()
        };
        let resolved = options.resolve(&description).unwrap();
        assert!((resolved.output_interval - 0.1).abs() < 1e-15);
    }

    #[test]
    fn invalid_spans_are_rejected() {
        let description = BouncingBall::description();
        let options = SimOptions {
            start_time: Some(2.0),
            stop_time: Some(1.0),
            ..SimOptions::default()
        };
        assert!(matches!(
            options.resolve(&description),
            Err(SimError::InvalidArg { .. })
        ));

        let options = SimOptions {
            output_interval: Some(-1.0),
            ..SimOptions::default()
        };
        assert!(options.resolve(&description).is_err());

        let options = SimOptions {
            resume: Some(ResumePoint {
                time: 5.0,
                next_event_time: None,
            }),
            ..SimOptions::default()
        };
        assert!(options.resolve(&description).is_err());
    }

    #[test]
    fn resume_sets_initial_time() {
        let description = BouncingBall::description();
        let options = SimOptions {
            resume: Some(ResumePoint {
                time: 1.5,
                next_event_time: None,
            }),
            ..SimOptions::default()
        };
        let resolved = options.resolve(&description).unwrap();
        assert_eq!(resolved.initial_time, 1.5);
        assert_eq!(resolved.start_time, 0.0);
    }
}
