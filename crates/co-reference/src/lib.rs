//! co-reference: reference models behind the model instance contract.
//!
//! Each model implements [`ReferenceModel`] (its equations only) and is
//! wrapped by [`ReferenceInstance`], which enforces the lifecycle state
//! machine and provides both model exchange and co-simulation. The models
//! stand in for native binaries in tests and in the command-line tool.
//!
//! # Example
//!
//! ```no_run
//! use co_model::{InstanceConfig, InterfaceType, Model, ModelInstance};
//! use co_reference::{BouncingBall, ReferenceFactory};
//!
//! let factory = ReferenceFactory::<BouncingBall>::new();
//! let mut inst = factory
//!     .instantiate(InstanceConfig::new("ball", InterfaceType::ModelExchange))
//!     .unwrap();
//!
//! inst.enter_initialization_mode(None, 0.0, Some(3.0)).unwrap();
//! inst.exit_initialization_mode().unwrap();
//!
//! let mut dx = [0.0; 2];
//! inst.get_derivatives(&mut dx).unwrap();
//! println!("der(v) = {}", dx[1]);
//! ```

pub mod bouncing_ball;
pub mod common;
pub mod dahlquist;
pub mod error;
pub mod feedthrough;
pub mod instance;
pub mod registry;
pub mod stair;
pub mod traits;
pub mod van_der_pol;

// Re-exports
pub use bouncing_ball::BouncingBall;
pub use dahlquist::Dahlquist;
pub use error::{ReferenceError, ReferenceResult};
pub use feedthrough::Feedthrough;
pub use instance::{Mode, ReferenceInstance};
pub use registry::{CoSimulationFlavor, MODEL_NAMES, ReferenceFactory, model_by_name};
pub use stair::Stair;
pub use traits::{EventUpdate, ReferenceModel};
pub use van_der_pol::VanDerPol;
