//! Simulation State
//!
//! The mutable record of one lending episode: random source, the episode's
//! own copy of the parameters, bank cash, and the applicant currently
//! awaiting a decision.
//!
//! # Critical Invariants
//!
//! 1. **Group Consistency**: `group_id == argmax(group)` whenever both are set.
//!    [`LendingState::set_applicant`] is the only writer of either field and
//!    derives one from the other.
//! 2. **Episode Isolation**: `params` is a clone of the environment's template;
//!    mutating it never touches the template.
//!
//! Applicant fields start unset and are filled by the first `ApplicantSampler`
//! call, before the environment exposes the state.

use crate::environment::SimulationError;
use crate::models::params::LendingParams;
use crate::models::population::{argmax, Applicant, PopulationError, PopulationModel};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Complete state of one lending episode
///
/// # Example
///
/// ```rust
/// use lending_simulator_core_rs::{LendingParams, LendingState, RngManager};
///
/// let params = LendingParams::simple_loans().unwrap();
/// let state = LendingState::new(params, RngManager::new(7));
/// assert_eq!(state.bank_cash(), 100.0);
/// assert!(state.applicant_features().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingState {
    /// Random source; advances on every applicant draw
    rng: RngManager,

    /// Episode copy of the parameters (cluster weights evolve here)
    params: LendingParams,

    /// Cash held by the bank (may go negative inside a step)
    bank_cash: f64,

    /// Clipped features of the current applicant
    applicant_features: Option<Vec<f64>>,

    /// One-hot group membership of the current applicant
    group: Option<Vec<u8>>,

    /// argmax of `group`
    group_id: Option<usize>,

    /// Latent outcome of the current applicant
    will_default: Option<bool>,
}

impl LendingState {
    /// Fresh state with starting cash and no applicant
    pub fn new(params: LendingParams, rng: RngManager) -> Self {
        let bank_cash = params.bank_starting_cash;
        Self {
            rng,
            params,
            bank_cash,
            applicant_features: None,
            group: None,
            group_id: None,
            will_default: None,
        }
    }

    pub fn rng(&self) -> &RngManager {
        &self.rng
    }

    /// Consume the state, keeping only its random stream
    pub fn into_rng(self) -> RngManager {
        self.rng
    }

    pub fn params(&self) -> &LendingParams {
        &self.params
    }

    /// Mutable access to the episode's population model
    pub fn population_mut(&mut self) -> &mut PopulationModel {
        &mut self.params.applicant_distribution
    }

    pub fn bank_cash(&self) -> f64 {
        self.bank_cash
    }

    /// Add `delta` to bank cash (negative to debit). No clamping.
    pub fn adjust_cash(&mut self, delta: f64) {
        self.bank_cash += delta;
    }

    pub fn applicant_features(&self) -> Option<&[f64]> {
        self.applicant_features.as_deref()
    }

    pub fn group(&self) -> Option<&[u8]> {
        self.group.as_deref()
    }

    pub fn group_id(&self) -> Option<usize> {
        self.group_id
    }

    pub fn will_default(&self) -> Option<bool> {
        self.will_default
    }

    /// Draw the next applicant from the episode's population model
    pub fn draw_applicant(&mut self) -> Result<Applicant, PopulationError> {
        self.params.applicant_distribution.sample(&mut self.rng)
    }

    /// Install `applicant` as the current applicant.
    ///
    /// Writes features, group, group index and default outcome together, so
    /// group index and membership can never drift apart.
    ///
    /// # Errors
    ///
    /// `GroupDesync` if the membership vector is empty.
    pub fn set_applicant(&mut self, applicant: Applicant) -> Result<(), SimulationError> {
        let group_id = applicant
            .group_id()
            .ok_or(SimulationError::GroupDesync {
                group_id: None,
                membership_argmax: None,
            })?;

        self.applicant_features = Some(applicant.features);
        self.group = Some(applicant.group);
        self.group_id = Some(group_id);
        self.will_default = Some(applicant.will_default);
        Ok(())
    }

    /// Verify `group_id == argmax(group)`
    pub fn check_group_consistency(&self) -> Result<(), SimulationError> {
        let membership_argmax = self.group.as_deref().and_then(argmax);
        if self.group_id != membership_argmax {
            return Err(SimulationError::GroupDesync {
                group_id: self.group_id,
                membership_argmax,
            });
        }
        Ok(())
    }

    /// True once an applicant has been sampled
    pub fn has_applicant(&self) -> bool {
        self.applicant_features.is_some()
    }
}
