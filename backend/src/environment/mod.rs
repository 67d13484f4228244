//! Lending environment: reset/step episode loop over the updater pipeline.
//!
//! See `engine.rs` for the state machine.

pub mod engine;
pub mod history;
pub mod render;
pub mod spaces;

pub use engine::{
    EnvPhase, EnvVariant, LendingEnv, Observation, SimulationError, StepResult,
};
pub use history::{History, HistoryEntry, HistoryRecord};
pub use render::{ApplicantPoint, RenderData, HUMAN_RENDER_MODE};
pub use spaces::{ActionSpace, BoxSpace, FeatureSpace, ObservationSpace};
