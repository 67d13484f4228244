//! State Updaters
//!
//! Each step of the lending environment is an ordered pipeline of updaters,
//! every one of which mutates the episode state in place:
//!
//! ```text
//! CashUpdater → feedback updater (CreditShiftUpdater | NoUpdate) → ApplicantSampler
//! ```
//!
//! # Updater Interface
//!
//! All updaters implement [`StateUpdater`]:
//! ```rust
//! use lending_simulator_core_rs::updaters::StateUpdater;
//! use lending_simulator_core_rs::{LendingState, LoanDecision, SimulationError};
//!
//! #[derive(Debug)]
//! struct CountAccepts;
//!
//! impl StateUpdater for CountAccepts {
//!     fn name(&self) -> &'static str {
//!         "count_accepts"
//!     }
//!
//!     fn update(
//!         &self,
//!         _state: &mut LendingState,
//!         _action: LoanDecision,
//!     ) -> Result<(), SimulationError> {
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Updaters carry no mutable state of their own; each environment builds its
//! own pipeline, so nothing is shared between environments.

use crate::environment::SimulationError;
use crate::models::{LendingParams, LendingState, LoanDecision};
use serde::{Deserialize, Serialize};

mod cash;
mod credit_shift;
mod sampler;

pub use cash::CashUpdater;
pub use credit_shift::{target_cluster, CreditShiftUpdater};
pub use sampler::ApplicantSampler;

/// One stage of the step pipeline
pub trait StateUpdater: std::fmt::Debug + Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Apply this stage to `state` for the agent's `action`
    ///
    /// # Errors
    ///
    /// Only invariant violations; a well-formed model never errors here.
    fn update(&self, state: &mut LendingState, action: LoanDecision)
        -> Result<(), SimulationError>;

    /// Reject a parameter template this stage cannot run on
    ///
    /// Called once when an environment is built, before any episode starts.
    fn check_params(&self, _params: &LendingParams) -> Result<(), SimulationError> {
        Ok(())
    }
}

/// Feedback slot for environments without population dynamics
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpdate;

impl StateUpdater for NoUpdate {
    fn name(&self) -> &'static str {
        "no_update"
    }

    fn update(
        &self,
        _state: &mut LendingState,
        _action: LoanDecision,
    ) -> Result<(), SimulationError> {
        Ok(())
    }
}

/// Which feedback mechanism an environment wires between cash settlement
/// and applicant sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedbackConfig {
    /// Population is static
    #[default]
    None,

    /// Accepted applicants move cluster mass up (repaid) or down (defaulted)
    CreditShift,
}

impl FeedbackConfig {
    /// Build the updater for this feedback mechanism
    pub fn build(self) -> Box<dyn StateUpdater> {
        match self {
            FeedbackConfig::None => Box::new(NoUpdate),
            FeedbackConfig::CreditShift => Box::new(CreditShiftUpdater),
        }
    }
}

/// The fixed three-stage step pipeline
#[derive(Debug)]
pub struct UpdatePipeline {
    cash: CashUpdater,
    feedback: Box<dyn StateUpdater>,
    sampler: ApplicantSampler,
}

impl UpdatePipeline {
    pub fn new(feedback: FeedbackConfig) -> Self {
        Self::with_feedback(feedback.build())
    }

    /// Pipeline with a custom feedback stage
    pub fn with_feedback(feedback: Box<dyn StateUpdater>) -> Self {
        Self {
            cash: CashUpdater,
            feedback,
            sampler: ApplicantSampler,
        }
    }

    pub fn sampler(&self) -> &ApplicantSampler {
        &self.sampler
    }

    pub fn feedback_name(&self) -> &'static str {
        self.feedback.name()
    }

    fn stages(&self) -> [&dyn StateUpdater; 3] {
        [&self.cash, self.feedback.as_ref(), &self.sampler]
    }

    /// Let every stage vet the parameter template
    pub fn check_params(&self, params: &LendingParams) -> Result<(), SimulationError> {
        for stage in self.stages() {
            stage.check_params(params)?;
        }
        Ok(())
    }

    /// Run cash → feedback → sampler, stopping at the first error
    pub fn run(&self, state: &mut LendingState, action: LoanDecision) -> Result<(), SimulationError> {
        for stage in self.stages() {
            stage.update(state, action)?;
        }
        Ok(())
    }
}
