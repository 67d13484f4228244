//! Applicant sampling

use super::StateUpdater;
use crate::environment::SimulationError;
use crate::models::{LendingState, LoanDecision};

/// Advances the state to the next applicant
///
/// Runs unconditionally every step: draws one applicant, clips the features
/// into `[min_observation, max_observation]`, and installs it on the state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicantSampler;

impl ApplicantSampler {
    /// Draw and install the next applicant (action-independent)
    pub fn advance(&self, state: &mut LendingState) -> Result<(), SimulationError> {
        let mut applicant = state.draw_applicant()?;

        let params = state.params();
        let (low, high) = (params.min_observation, params.max_observation);
        for value in applicant.features.iter_mut() {
            *value = value.clamp(low, high);
        }

        state.set_applicant(applicant)
    }
}

impl StateUpdater for ApplicantSampler {
    fn name(&self) -> &'static str {
        "applicant_sampler"
    }

    fn update(&self, state: &mut LendingState, _action: LoanDecision) -> Result<(), SimulationError> {
        self.advance(state)
    }
}
