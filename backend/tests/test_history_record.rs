//! History Record Tests
//!
//! Export of an episode's history tagged with the params fingerprint, and
//! rejection of records produced under a different template.

use lending_simulator_core_rs::{
    EnvVariant, HistoryRecord, LendingEnv, LendingParams, LoanDecision, SimulationError,
};

fn played_env(steps: usize) -> LendingEnv {
    let _ = env_logger::try_init();
    let mut env = LendingEnv::new(EnvVariant::delayed_impact().unwrap(), 4242).unwrap();
    env.reset().unwrap();
    for step in 0..steps {
        let action = if step % 2 == 0 {
            LoanDecision::Accept
        } else {
            LoanDecision::Reject
        };
        if env.step(action).unwrap().done {
            break;
        }
    }
    env
}

#[test]
fn test_record_roundtrip() {
    let env = played_env(25);
    let record = env.history().to_record(env.initial_params()).unwrap();
    assert_eq!(record.entries.len(), env.history().len());

    let json = record.to_json().unwrap();
    let loaded = HistoryRecord::from_json(&json, env.initial_params()).unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.entries, env.history().entries());
}

#[test]
fn test_record_tagged_with_fingerprint() {
    let env = played_env(5);
    let record = env.history().to_record(env.initial_params()).unwrap();
    assert_eq!(record.params_hash, env.initial_params().fingerprint().unwrap());
    assert_eq!(record.params_hash.len(), 64);
}

#[test]
fn test_record_rejected_under_other_params() {
    let env = played_env(5);
    let json = env
        .history()
        .to_record(env.initial_params())
        .unwrap()
        .to_json()
        .unwrap();

    let other = LendingParams::simple_loans().unwrap();
    assert!(matches!(
        HistoryRecord::from_json(&json, &other),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_malformed_record_rejected() {
    let params = LendingParams::delayed_impact().unwrap();
    assert!(matches!(
        HistoryRecord::from_json("{\"params_hash\": 3}", &params),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_snapshots_track_evolving_weights() {
    let env = played_env(60);
    let entries = env.history().entries();

    // The first snapshot is taken before any feedback
    assert_eq!(entries[0].state().params(), env.initial_params());

    let last = &entries.last().unwrap().state().params().applicant_distribution;
    assert_ne!(last, &env.initial_params().applicant_distribution);
}
