//! Cash settlement of the current applicant's loan

use super::StateUpdater;
use crate::environment::SimulationError;
use crate::models::{LendingState, LoanDecision};

/// Settles the bank's cash on the current applicant
///
/// - Reject: no change
/// - Accept and default: `-loan_amount`
/// - Accept and repay: `+loan_amount * interest_rate`
///
/// Cash is not clamped; termination is checked by the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashUpdater;

impl CashUpdater {
    /// Cash change for `action` on an applicant with the given outcome
    pub fn cash_delta(state: &LendingState, action: LoanDecision) -> Result<f64, SimulationError> {
        if !action.is_accept() {
            return Ok(0.0);
        }

        let will_default = state
            .will_default()
            .ok_or(SimulationError::MissingApplicant)?;
        let params = state.params();

        Ok(if will_default {
            -params.loan_amount
        } else {
            params.loan_amount * params.interest_rate
        })
    }
}

impl StateUpdater for CashUpdater {
    fn name(&self) -> &'static str {
        "cash"
    }

    fn update(&self, state: &mut LendingState, action: LoanDecision) -> Result<(), SimulationError> {
        let delta = Self::cash_delta(state, action)?;
        if delta != 0.0 {
            state.adjust_cash(delta);
        }
        Ok(())
    }
}
