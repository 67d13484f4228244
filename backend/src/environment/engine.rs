//! Lending Environment Engine
//!
//! Episode state machine around the update pipeline:
//!
//! ```text
//! Uninitialized ──reset──▶ Ready ──step (cash < loan_amount)──▶ Terminated
//!                           │  ▲                                   │
//!                           │  └──────────────reset────────────────┘
//!                           └──step (invariant violation)──▶ Faulted ──reset──▶ Ready
//! ```
//!
//! # Step Order
//!
//! ```text
//! 1. Snapshot the state being acted upon
//! 2. CashUpdater        (settle the current applicant's loan)
//! 3. Feedback updater   (CreditShiftUpdater or NoUpdate, same applicant)
//! 4. ApplicantSampler   (advance to the next applicant)
//! 5. Append (snapshot, action) to history
//! 6. Terminate if bank_cash < loan_amount
//! ```
//!
//! # Example
//!
//! ```rust
//! use lending_simulator_core_rs::{EnvVariant, LendingEnv, LoanDecision};
//!
//! let mut env = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 12345).unwrap();
//! env.reset().unwrap();
//!
//! while !env.is_done() {
//!     let result = env.step(LoanDecision::Accept).unwrap();
//!     if result.step >= 50 {
//!         break;
//!     }
//! }
//! assert!(!env.history().is_empty());
//! ```

use super::history::{History, HistoryEntry};
use super::spaces::{ActionSpace, ObservationSpace};
use crate::models::population::PopulationError;
use crate::models::{LendingParams, LendingState, LoanDecision};
use crate::rng::RngManager;
use crate::updaters::{FeedbackConfig, StateUpdater, UpdatePipeline};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Simulation error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// Parameter template rejected at construction or load
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Population model broke a mixture invariant
    #[error("Invariant violation: {0}")]
    InvariantViolation(#[from] PopulationError),

    /// Group index no longer matches argmax of the membership vector
    #[error("Group index {group_id:?} out of sync with membership argmax {membership_argmax:?}")]
    GroupDesync {
        group_id: Option<usize>,
        membership_argmax: Option<usize>,
    },

    /// The current applicant's cluster holds no probability mass
    #[error("Cluster {cluster} of group {group} was sampled but has no mass")]
    EmptyCluster { group: usize, cluster: usize },

    /// An updater needed applicant fields that were never sampled
    #[error("No applicant has been sampled")]
    MissingApplicant,

    #[error("Invalid action {0}: expected 0 (reject) or 1 (accept)")]
    InvalidAction(i64),

    #[error("Episode has terminated; call reset() before stepping")]
    PostTerminationStep,

    #[error("Environment has not been reset")]
    NotReset,

    #[error("Environment faulted on an invariant violation; call reset()")]
    Faulted,

    #[error("Unsupported render request: {0}")]
    UnsupportedRenderRequest(String),
}

impl SimulationError {
    /// True for errors that indicate a corrupted population model or state
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            SimulationError::InvariantViolation(_)
                | SimulationError::GroupDesync { .. }
                | SimulationError::EmptyCluster { .. }
                | SimulationError::MissingApplicant
        )
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// An environment variant: parameter template plus feedback mechanism
///
/// Variants differ only in data; all share the same three-stage pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVariant {
    pub name: String,
    pub params: LendingParams,
    pub feedback: FeedbackConfig,
}

impl EnvVariant {
    /// Static population, groups express creditworthiness identically
    pub fn simple_loans() -> Result<Self, SimulationError> {
        Ok(Self {
            name: "simple_loans".to_string(),
            params: LendingParams::simple_loans()?,
            feedback: FeedbackConfig::None,
        })
    }

    /// Static population, groups express creditworthiness differently
    pub fn differential_expression() -> Result<Self, SimulationError> {
        Ok(Self {
            name: "differential_expression".to_string(),
            params: LendingParams::differential_expression()?,
            feedback: FeedbackConfig::None,
        })
    }

    /// Credit-score clusters with credit-shift feedback
    pub fn delayed_impact() -> Result<Self, SimulationError> {
        Ok(Self {
            name: "delayed_impact".to_string(),
            params: LendingParams::delayed_impact()?,
            feedback: FeedbackConfig::CreditShift,
        })
    }

    /// Look up a built-in variant by name
    pub fn by_name(name: &str) -> Result<Self, SimulationError> {
        match name {
            "simple_loans" => Self::simple_loans(),
            "differential_expression" => Self::differential_expression(),
            "delayed_impact" => Self::delayed_impact(),
            other => Err(SimulationError::InvalidConfig(format!(
                "Unknown environment variant: {}",
                other
            ))),
        }
    }
}

/// Lifecycle phase of the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvPhase {
    Uninitialized,
    Ready,
    Terminated,
    Faulted,
}

/// Observable part of the state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub bank_cash: f64,
    pub applicant_features: Vec<f64>,
    pub group: Vec<u8>,
}

impl Observation {
    fn from_state(state: &LendingState) -> Self {
        Self {
            bank_cash: state.bank_cash(),
            applicant_features: state.applicant_features().unwrap_or_default().to_vec(),
            group: state.group().unwrap_or_default().to_vec(),
        }
    }
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Number of steps completed in this episode, including this one
    pub step: usize,

    /// Observation of the next applicant
    pub observation: Observation,

    /// Change in bank cash caused by this step's decision
    pub cash_delta: f64,

    /// Whether the episode terminated on this step
    pub done: bool,
}

// ============================================================================
// Environment
// ============================================================================

/// Loan-decision environment
///
/// Owns the immutable parameter template, the update pipeline, the current
/// episode state and its history.
///
/// # Determinism
///
/// All randomness flows through the state's `RngManager`. Same seed and same
/// action sequence give identical trajectories. `reset` carries the stream
/// over from the previous episode rather than re-seeding.
#[derive(Debug)]
pub struct LendingEnv {
    name: String,

    /// Template cloned into every episode; never mutated
    initial_params: LendingParams,

    pipeline: UpdatePipeline,

    /// Seed used when no previous episode exists
    seed: u64,

    state: Option<LendingState>,

    history: History,

    phase: EnvPhase,

    observation_space: ObservationSpace,
}

impl LendingEnv {
    /// Create an environment for a variant
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the template is invalid, or if credit-shift
    /// feedback is requested on a population whose cluster order does not
    /// match its features.
    pub fn new(variant: EnvVariant, seed: u64) -> Result<Self, SimulationError> {
        let pipeline = UpdatePipeline::new(variant.feedback);
        Self::assemble(variant.name, variant.params, pipeline, seed)
    }

    /// Create an environment from a template and an explicit feedback updater
    ///
    /// Applies the same checks as [`LendingEnv::new`], including the
    /// feedback updater's own parameter requirements.
    pub fn with_params(
        params: LendingParams,
        feedback: Box<dyn StateUpdater>,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        let pipeline = UpdatePipeline::with_feedback(feedback);
        Self::assemble("custom".to_string(), params, pipeline, seed)
    }

    fn assemble(
        name: String,
        params: LendingParams,
        pipeline: UpdatePipeline,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        params.validate()?;
        pipeline.check_params(&params)?;

        let observation_space = ObservationSpace::for_params(&params);
        Ok(Self {
            name,
            initial_params: params,
            pipeline,
            seed,
            state: None,
            history: History::new(),
            phase: EnvPhase::Uninitialized,
            observation_space,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> EnvPhase {
        self.phase
    }

    /// True once the episode has terminated
    pub fn is_done(&self) -> bool {
        self.phase == EnvPhase::Terminated
    }

    /// Current episode state (`None` before the first reset)
    pub fn state(&self) -> Option<&LendingState> {
        self.state.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The template every episode starts from
    pub fn initial_params(&self) -> &LendingParams {
        &self.initial_params
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::default()
    }

    pub fn feedback_name(&self) -> &'static str {
        self.pipeline.feedback_name()
    }

    /// Observation of the current state
    pub fn observation(&self) -> Result<Observation, SimulationError> {
        self.state
            .as_ref()
            .map(Observation::from_state)
            .ok_or(SimulationError::NotReset)
    }

    // ========================================================================
    // Episode Control
    // ========================================================================

    /// Start a new episode, continuing the current random stream
    pub fn reset(&mut self) -> Result<Observation, SimulationError> {
        let rng = match self.state.take() {
            Some(previous) => previous.into_rng(),
            None => RngManager::new(self.seed),
        };
        self.start_episode(rng)
    }

    /// Start a new episode on a fresh random stream
    pub fn reset_with_seed(&mut self, seed: u64) -> Result<Observation, SimulationError> {
        self.seed = seed;
        self.state = None;
        self.start_episode(RngManager::new(seed))
    }

    fn start_episode(&mut self, rng: RngManager) -> Result<Observation, SimulationError> {
        let mut state = LendingState::new(self.initial_params.clone(), rng);
        self.history.clear();

        if let Err(err) = self.pipeline.sampler().advance(&mut state) {
            self.phase = EnvPhase::Faulted;
            self.state = Some(state);
            return Err(err);
        }

        let observation = Observation::from_state(&state);
        self.state = Some(state);
        self.phase = EnvPhase::Ready;

        log::info!(
            "Environment '{}' reset: bank_cash={}",
            self.name,
            observation.bank_cash
        );
        Ok(observation)
    }

    /// Step with a raw discrete action index
    ///
    /// # Errors
    ///
    /// `InvalidAction` for anything but 0 or 1; no state changes in that case.
    pub fn step_index(&mut self, action: i64) -> Result<StepResult, SimulationError> {
        let decision = LoanDecision::from_index(action).ok_or(SimulationError::InvalidAction(action))?;
        self.step(decision)
    }

    /// Apply the agent's decision on the current applicant
    ///
    /// # Errors
    ///
    /// - `NotReset` before the first `reset`
    /// - `PostTerminationStep` after termination
    /// - `Faulted` after an earlier invariant violation
    /// - Any error raised by an updater. The state is rolled back to where
    ///   it was before the step; invariant violations also move the
    ///   environment to `Faulted`.
    pub fn step(&mut self, action: LoanDecision) -> Result<StepResult, SimulationError> {
        match self.phase {
            EnvPhase::Ready => {}
            EnvPhase::Uninitialized => return Err(SimulationError::NotReset),
            EnvPhase::Terminated => return Err(SimulationError::PostTerminationStep),
            EnvPhase::Faulted => return Err(SimulationError::Faulted),
        }

        let state = self.state.as_mut().ok_or(SimulationError::NotReset)?;
        let snapshot = state.clone();

        if let Err(err) = self.pipeline.run(state, action) {
            log::error!("Step aborted in '{}': {}", self.name, err);
            // No partial step survives: cash settled by an earlier stage is undone
            *state = snapshot;
            if err.is_invariant_violation() {
                self.phase = EnvPhase::Faulted;
            }
            return Err(err);
        }

        let cash_delta = state.bank_cash() - snapshot.bank_cash();
        let done = state.bank_cash() < state.params().loan_amount;
        let observation = Observation::from_state(state);

        self.history.push(HistoryEntry::new(snapshot, action));

        if done {
            self.phase = EnvPhase::Terminated;
            log::info!(
                "Environment '{}' terminated after {} steps: bank_cash={}",
                self.name,
                self.history.len(),
                observation.bank_cash
            );
        }

        Ok(StepResult {
            step: self.history.len(),
            observation,
            cash_delta,
            done,
        })
    }
}
