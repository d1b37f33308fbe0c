//! co-sim: master algorithms for model instances.
//!
//! Provides:
//! - Model Exchange loop with event iteration and pause/resume
//! - Co-Simulation loop with early return, event mode and discard handling
//! - Continuous solvers: fixed-step forward Euler and adaptive BDF
//! - Input signals with interpolation and discontinuity detection
//! - Output recorder producing a columnar trajectory
//!
//! # Example
//!
//! ```no_run
//! use co_reference::{BouncingBall, ReferenceFactory};
//! use co_sim::{SimOptions, SolverKind, simulate};
//!
//! let model = ReferenceFactory::<BouncingBall>::new();
//! let options = SimOptions {
//!     solver: SolverKind::Euler,
//!     stop_time: Some(1.0),
//!     ..SimOptions::default()
//! };
//! let outcome = simulate(&model, &options).unwrap();
//! println!("{} rows, stopped: {:?}", outcome.trajectory.len(), outcome.stop_reason);
//! ```

pub mod error;
pub mod events;
pub mod input;
pub mod master;
pub mod options;
pub mod recorder;
pub mod solver;
pub mod start_values;
pub mod trajectory;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use events::{Event, EventIteration, iterate_discrete_states};
pub use input::{InputSignal, InputTable};
pub use master::{
    SimOutcome, StepFinished, StopReason, run_co_simulation, run_model_exchange, simulate,
    simulate_with_progress,
};
pub use options::{ResolvedOptions, ResumePoint, SimOptions};
pub use recorder::Recorder;
pub use solver::{ActiveSolver, BdfOptions, BdfSolver, ForwardEuler, Solver, SolverKind, SolverStep};
pub use start_values::{StartValue, StartValues};
pub use trajectory::{Column, Trajectory};
