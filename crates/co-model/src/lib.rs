//! co-model: the contract between the simulation engine and a model instance.
//!
//! A model instance is a black-box dynamical system behind a fixed lifecycle
//! API. This crate only describes that API; concrete instances come from a
//! native binding layer or, in this workspace, from `co-reference`.

pub mod config;
pub mod description;
pub mod error;
pub mod instance;
pub mod logged;
pub mod value;

pub use co_core::ValueReference;
pub use config::{InstanceConfig, InterfaceType, LogRecord, LogSink};
pub use description::{
    Causality, CoSimulationInfo, DefaultExperiment, Initial, ModelDescription, ModelVariable,
    Variability,
};
pub use error::{InstanceError, InstanceResult, Status};
pub use instance::{
    Capabilities, CompletedIntegratorStep, DiscreteStatesUpdate, DoStepOutcome, Model,
    ModelInstance,
};
pub use logged::LoggedInstance;
pub use value::{ScalarValue, ValueBuffer, Values, ValuesMut, VariableType};
