//! Environment Lifecycle Tests
//!
//! Reset/step semantics, termination, history snapshots, episode isolation
//! and render data.

use lending_simulator_core_rs::environment::{FeatureSpace, HUMAN_RENDER_MODE};
use lending_simulator_core_rs::models::population::{
    ClusterComponent, ClusterMixture, ClusterWeights, FeatureDistribution, GroupSpec,
    PopulationModel,
};
use lending_simulator_core_rs::updaters::{CreditShiftUpdater, NoUpdate, StateUpdater};
use lending_simulator_core_rs::{
    EnvPhase, EnvVariant, FeedbackConfig, LendingEnv, LendingParams, LendingState, LoanDecision,
    SimulationError,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Single-group population whose applicants default with `default_probability`
fn fixed_outcome_params(starting_cash: f64, default_probability: f64) -> LendingParams {
    let component = ClusterComponent::new(
        FeatureDistribution::Gaussian {
            mean: vec![0.0, 0.0],
            std_dev: 0.5,
        },
        default_probability,
    );
    let mixture = ClusterMixture::new(ClusterWeights::new(vec![1.0]).unwrap(), vec![component]);

    let mut params = LendingParams::simple_loans().unwrap();
    params.bank_starting_cash = starting_cash;
    params.applicant_distribution =
        PopulationModel::new(vec![GroupSpec::new(0, 1, 1.0, mixture)]).unwrap();
    params
}

/// Feedback stage that refuses every accepted loan
#[derive(Debug)]
struct RefuseAccepts;

impl StateUpdater for RefuseAccepts {
    fn name(&self) -> &'static str {
        "refuse_accepts"
    }

    fn update(&self, _state: &mut LendingState, action: LoanDecision) -> Result<(), SimulationError> {
        if action.is_accept() {
            return Err(SimulationError::InvalidConfig("accepts disabled".to_string()));
        }
        Ok(())
    }
}

/// Feedback stage that reports a corrupted population on every accept
#[derive(Debug)]
struct CorruptOnAccept;

impl StateUpdater for CorruptOnAccept {
    fn name(&self) -> &'static str {
        "corrupt_on_accept"
    }

    fn update(&self, _state: &mut LendingState, action: LoanDecision) -> Result<(), SimulationError> {
        if action.is_accept() {
            return Err(SimulationError::EmptyCluster { group: 0, cluster: 0 });
        }
        Ok(())
    }
}

fn always_default_env(starting_cash: f64) -> LendingEnv {
    let _ = env_logger::try_init();
    LendingEnv::with_params(fixed_outcome_params(starting_cash, 1.0), Box::new(NoUpdate), 42)
        .unwrap()
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_produces_starting_observation() {
    let _ = env_logger::try_init();
    let mut env = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 1).unwrap();
    let observation = env.reset().unwrap();

    assert_eq!(observation.bank_cash, 100.0);
    assert_eq!(observation.applicant_features.len(), 7);
    assert_eq!(observation.group.len(), 2);
    assert_eq!(env.phase(), EnvPhase::Ready);
    assert!(env.history().is_empty());
    assert!(env.observation_space().applicant_features.contains(&observation.applicant_features));
}

#[test]
fn test_observation_space_matches_params() {
    let env = LendingEnv::new(EnvVariant::simple_loans().unwrap(), 1).unwrap();
    let space = env.observation_space();

    match &space.applicant_features {
        FeatureSpace::Box(features) => {
            assert_eq!(features.shape, vec![2]);
            assert_eq!(features.low, -3.0);
            assert_eq!(features.high, 3.0);
        }
        other => panic!("expected a box feature space, got {:?}", other),
    }
    assert_eq!(space.group, 2);
    assert!(env.action_space().contains(0));
    assert!(env.action_space().contains(1));
    assert!(!env.action_space().contains(2));
}

#[test]
fn test_reset_restores_cluster_weights() {
    let mut env = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 8).unwrap();
    let template = env.initial_params().clone();
    env.reset().unwrap();

    for _ in 0..200 {
        if env.step(LoanDecision::Accept).unwrap().done {
            break;
        }
    }
    let shifted = env.state().unwrap().params().applicant_distribution.clone();
    assert_ne!(shifted, template.applicant_distribution);
    assert_eq!(env.initial_params(), &template);

    env.reset().unwrap();
    assert_eq!(
        env.state().unwrap().params().applicant_distribution,
        template.applicant_distribution
    );
    assert!(env.history().is_empty());
}

// ============================================================================
// Step
// ============================================================================

#[test]
fn test_reject_keeps_cash_and_population() {
    let mut env = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 3).unwrap();
    env.reset().unwrap();

    for _ in 0..50 {
        let result = env.step(LoanDecision::Reject).unwrap();
        assert_eq!(result.cash_delta, 0.0);
        assert_eq!(result.observation.bank_cash, 100.0);
        assert!(!result.done);
    }
    assert_eq!(
        env.state().unwrap().params().applicant_distribution,
        env.initial_params().applicant_distribution
    );
    assert_eq!(env.history().len(), 50);
}

#[test]
fn test_step_counts_from_one() {
    let mut env = LendingEnv::new(EnvVariant::simple_loans().unwrap(), 3).unwrap();
    env.reset().unwrap();
    assert_eq!(env.step(LoanDecision::Reject).unwrap().step, 1);
    assert_eq!(env.step_index(1).unwrap().step, 2);
}

#[test]
fn test_cash_equal_to_loan_amount_is_not_done() {
    let mut env = always_default_env(2.0);
    env.reset().unwrap();

    let first = env.step(LoanDecision::Accept).unwrap();
    assert_eq!(first.observation.bank_cash, 1.0);
    assert_eq!(first.cash_delta, -1.0);
    assert!(!first.done);
    assert!(!env.is_done());

    let second = env.step(LoanDecision::Accept).unwrap();
    assert_eq!(second.observation.bank_cash, 0.0);
    assert!(second.done);
    assert_eq!(env.phase(), EnvPhase::Terminated);
}

#[test]
fn test_step_after_termination_is_rejected() {
    let mut env = always_default_env(1.0);
    env.reset().unwrap();
    assert!(env.step(LoanDecision::Accept).unwrap().done);

    let state_at_end = env.state().unwrap().clone();
    assert_eq!(
        env.step(LoanDecision::Reject),
        Err(SimulationError::PostTerminationStep)
    );
    assert_eq!(env.state().unwrap(), &state_at_end);
    assert_eq!(env.history().len(), 1);

    env.reset().unwrap();
    assert_eq!(env.phase(), EnvPhase::Ready);
    assert!(env.step(LoanDecision::Reject).is_ok());
}

#[test]
fn test_failed_step_rolls_back_settlement() {
    let mut env = LendingEnv::with_params(
        fixed_outcome_params(50.0, 0.0),
        Box::new(RefuseAccepts),
        11,
    )
    .unwrap();
    env.reset().unwrap();
    let before = env.state().unwrap().clone();

    for _ in 0..2 {
        assert!(matches!(
            env.step(LoanDecision::Accept),
            Err(SimulationError::InvalidConfig(_))
        ));
        assert_eq!(env.state().unwrap(), &before);
        assert_eq!(env.phase(), EnvPhase::Ready);
        assert!(env.history().is_empty());
    }

    let result = env.step(LoanDecision::Reject).unwrap();
    assert_eq!(result.cash_delta, 0.0);
    assert_eq!(result.observation.bank_cash, 50.0);
    assert_eq!(env.history().len(), 1);
}

#[test]
fn test_invariant_violation_faults_and_rolls_back() {
    let mut env = LendingEnv::with_params(
        fixed_outcome_params(50.0, 0.0),
        Box::new(CorruptOnAccept),
        11,
    )
    .unwrap();
    env.reset().unwrap();
    let before = env.state().unwrap().clone();

    let err = env.step(LoanDecision::Accept).unwrap_err();
    assert!(err.is_invariant_violation());
    assert_eq!(env.phase(), EnvPhase::Faulted);
    assert_eq!(env.state().unwrap(), &before);
    assert_eq!(env.step(LoanDecision::Reject), Err(SimulationError::Faulted));

    env.reset().unwrap();
    assert_eq!(env.phase(), EnvPhase::Ready);
}

#[test]
fn test_repaying_population_never_terminates() {
    let mut env = LendingEnv::with_params(fixed_outcome_params(1.0, 0.0), Box::new(NoUpdate), 9)
        .unwrap();
    env.reset().unwrap();

    for step in 1..=100 {
        let result = env.step(LoanDecision::Accept).unwrap();
        assert!(!result.done);
        assert_eq!(result.observation.bank_cash, 1.0 + step as f64);
    }
}

#[test]
fn test_history_holds_pre_step_snapshots() {
    let mut env = always_default_env(5.0);
    let first = env.reset().unwrap();

    env.step(LoanDecision::Accept).unwrap();
    env.step(LoanDecision::Reject).unwrap();
    env.step(LoanDecision::Accept).unwrap();

    let history = env.history();
    assert_eq!(history.cash_trajectory(), vec![5.0, 4.0, 4.0]);
    assert_eq!(
        history.entries()[0].state().applicant_features(),
        Some(first.applicant_features.as_slice())
    );

    let actions: Vec<LoanDecision> = history.iter().map(|e| e.action()).collect();
    assert_eq!(
        actions,
        vec![LoanDecision::Accept, LoanDecision::Reject, LoanDecision::Accept]
    );
    assert_eq!(env.state().unwrap().bank_cash(), 3.0);
}

#[test]
fn test_episodes_do_not_share_state() {
    let mut env_a = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 77).unwrap();
    let mut env_b = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 77).unwrap();
    env_a.reset().unwrap();
    env_b.reset().unwrap();

    for _ in 0..30 {
        env_a.step(LoanDecision::Accept).unwrap();
    }

    assert_eq!(
        env_b.state().unwrap().params().applicant_distribution,
        env_b.initial_params().applicant_distribution
    );
    assert!(env_b.history().is_empty());
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_with_params_checks_feedback_requirements() {
    let result = LendingEnv::with_params(
        LendingParams::simple_loans().unwrap(),
        Box::new(CreditShiftUpdater),
        7,
    );
    assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));

    assert!(LendingEnv::with_params(
        LendingParams::delayed_impact().unwrap(),
        Box::new(CreditShiftUpdater),
        7,
    )
    .is_ok());
}

#[test]
fn test_variants_wire_expected_feedback() {
    for (name, feedback) in [
        ("simple_loans", "no_update"),
        ("differential_expression", "no_update"),
        ("delayed_impact", "credit_shift"),
    ] {
        let env = LendingEnv::new(EnvVariant::by_name(name).unwrap(), 1).unwrap();
        assert_eq!(env.name(), name);
        assert_eq!(env.feedback_name(), feedback);
    }
}

#[test]
fn test_variant_with_invalid_params_rejected() {
    let mut variant = EnvVariant::simple_loans().unwrap();
    variant.params.min_observation = 5.0;
    assert!(matches!(
        LendingEnv::new(variant, 1),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_variant_config_from_json() {
    let variant = EnvVariant::delayed_impact().unwrap();
    let json = serde_json::to_string(&variant).unwrap();
    let loaded: EnvVariant = serde_json::from_str(&json).unwrap();

    assert_eq!(loaded, variant);
    assert_eq!(loaded.feedback, FeedbackConfig::CreditShift);
    assert!(LendingEnv::new(loaded, 3).is_ok());
}

// ============================================================================
// Render
// ============================================================================

#[test]
fn test_render_data_for_two_dimensional_features() {
    let mut env = LendingEnv::new(EnvVariant::simple_loans().unwrap(), 10).unwrap();
    env.reset().unwrap();
    env.step(LoanDecision::Accept).unwrap();
    env.step(LoanDecision::Reject).unwrap();
    env.step(LoanDecision::Accept).unwrap();

    let data = env.render_data(HUMAN_RENDER_MODE).unwrap();
    assert_eq!(data.accepted.len(), 2);
    assert_eq!(data.cash.len(), 4);
    assert_eq!(data.cash.last().copied(), Some(env.state().unwrap().bank_cash()));
    assert_eq!(data.current.group_id, env.state().unwrap().group_id().unwrap());
}

#[test]
fn test_render_rejects_other_modes() {
    let mut env = LendingEnv::new(EnvVariant::simple_loans().unwrap(), 10).unwrap();
    env.reset().unwrap();
    assert!(matches!(
        env.render_data("rgb_array"),
        Err(SimulationError::UnsupportedRenderRequest(_))
    ));
}

#[test]
fn test_render_rejects_high_dimensional_features() {
    let mut env = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 10).unwrap();
    env.reset().unwrap();
    assert!(matches!(
        env.render_data(HUMAN_RENDER_MODE),
        Err(SimulationError::UnsupportedRenderRequest(_))
    ));
}
