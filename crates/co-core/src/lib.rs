//! co-core: numeric foundation shared by the co-simulation crates.
//!
//! Contains:
//! - numeric (Real + tolerances + epsilon comparisons)
//! - grid (output/communication grid arithmetic)
//! - ids (value references into a model instance)
//! - timing (wall-clock stopwatch for advisory timeouts)
//! - error (shared error types)

pub mod error;
pub mod grid;
pub mod ids;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use grid::*;
pub use ids::*;
pub use numeric::*;
pub use timing::{RunStats, Stopwatch};
