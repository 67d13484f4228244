//! Lending Simulator Core - Rust Engine
//!
//! Sequential loan-decision environment with deterministic execution.
//!
//! # Architecture
//!
//! - **models**: Domain types (LendingParams, PopulationModel, LendingState)
//! - **updaters**: Step pipeline stages (cash, credit shift, applicant sampling)
//! - **environment**: Reset/step episode loop, spaces, history, render data
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Cluster weights of every group sum to 1 and stay non-negative
//! 2. `group_id` always equals argmax of the membership vector
//! 3. All randomness is deterministic (seeded RNG)
//! 4. The parameter template is never mutated by an episode
//! 5. FFI boundary is minimal and safe

// Module declarations
pub mod environment;
pub mod models;
pub mod rng;
pub mod updaters;

// Re-exports for convenience
pub use environment::{
    EnvPhase, EnvVariant, History, HistoryEntry, HistoryRecord, LendingEnv, Observation,
    SimulationError, StepResult,
};
pub use models::{
    Applicant, LendingParams, LendingState, LoanDecision, PopulationError, PopulationModel,
};
pub use rng::RngManager;
pub use updaters::{FeedbackConfig, StateUpdater};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn lending_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::env::PyLendingEnv>()?;
    Ok(())
}
