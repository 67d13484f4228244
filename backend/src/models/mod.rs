//! Domain models for the lending simulator

pub mod decision;
pub mod params;
pub mod population;
pub mod state;

// Re-exports
pub use decision::LoanDecision;
pub use params::LendingParams;
pub use population::{Applicant, PopulationError, PopulationModel};
pub use state::LendingState;
