//! Credit-shift feedback
//!
//! Successful repayment raises an applicant's credit score and default lowers
//! it. The population-level effect is modelled by moving a small amount of
//! probability mass from the applicant's credit cluster to the adjacent one
//! within their group's mixture, which changes how likely future applicants of
//! that group are to land in better or worse clusters.
//!
//! Only accepted applicants move mass; rejected applicants leave the
//! population unchanged.

use super::StateUpdater;
use crate::environment::SimulationError;
use crate::models::population::argmax;
use crate::models::{LendingParams, LendingState, LoanDecision};

/// Cluster an applicant moves to: one down on default, one up on repayment,
/// saturated at both ends of `[0, num_clusters - 1]`.
///
/// # Example
/// ```
/// use lending_simulator_core_rs::updaters::target_cluster;
///
/// assert_eq!(target_cluster(1, 3, true), 0);
/// assert_eq!(target_cluster(2, 3, false), 2); // already at the top
/// assert_eq!(target_cluster(0, 3, true), 0); // already at the bottom
/// ```
pub fn target_cluster(cluster: usize, num_clusters: usize, defaulted: bool) -> usize {
    let top = num_clusters.saturating_sub(1);
    if defaulted {
        cluster.saturating_sub(1)
    } else {
        (cluster + 1).min(top)
    }
}

/// Moves cluster mass in response to accepted applicants' outcomes
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditShiftUpdater;

impl StateUpdater for CreditShiftUpdater {
    fn name(&self) -> &'static str {
        "credit_shift"
    }

    fn update(&self, state: &mut LendingState, action: LoanDecision) -> Result<(), SimulationError> {
        if !action.is_accept() {
            return Ok(());
        }

        state.check_group_consistency()?;

        let group_id = state.group_id().ok_or(SimulationError::MissingApplicant)?;
        let will_default = state.will_default().ok_or(SimulationError::MissingApplicant)?;
        let cluster_id = state
            .applicant_features()
            .and_then(argmax)
            .ok_or(SimulationError::MissingApplicant)?;

        let params = state.params();
        let increment = params.cluster_shift_increment;
        let weights = params.applicant_distribution.cluster_weights(group_id)?;

        let available = weights
            .get(cluster_id)
            .copied()
            .ok_or(SimulationError::EmptyCluster {
                group: group_id,
                cluster: cluster_id,
            })?;
        if !(available > 0.0) {
            return Err(SimulationError::EmptyCluster {
                group: group_id,
                cluster: cluster_id,
            });
        }

        let new_cluster = target_cluster(cluster_id, weights.len(), will_default);
        let mass_to_shift = increment.min(available);

        state
            .population_mut()
            .shift_mass(group_id, cluster_id, new_cluster, mass_to_shift)?;

        log::debug!(
            "Group {}: moving mass {} from cluster {} to {}",
            group_id,
            mass_to_shift,
            cluster_id,
            new_cluster
        );
        Ok(())
    }

    /// Cluster identity is read back as argmax of the features and group
    /// identity as argmax of the membership vector, so both orderings must
    /// hold for the population.
    fn check_params(&self, params: &LendingParams) -> Result<(), SimulationError> {
        params
            .applicant_distribution
            .validate_cluster_ordering()
            .map_err(|e| SimulationError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::population::{
        Applicant, ClusterComponent, ClusterMixture, ClusterWeights, FeatureDistribution,
        GroupSpec, PopulationModel,
    };
    use crate::models::LendingParams;
    use crate::rng::RngManager;

    fn state_at(weights: Vec<f64>, cluster: usize, will_default: bool) -> LendingState {
        let dim = weights.len();
        let components = (0..dim)
            .map(|index| ClusterComponent::new(FeatureDistribution::OneHot { index, dim }, 0.5))
            .collect();
        let mixture = ClusterMixture::new(ClusterWeights::new(weights).unwrap(), components);

        let mut params = LendingParams::delayed_impact().unwrap();
        params.cluster_shift_increment = 0.4;
        params.applicant_distribution =
            PopulationModel::new(vec![GroupSpec::new(0, 1, 1.0, mixture)]).unwrap();

        let mut features = vec![0.0; dim];
        features[cluster] = 1.0;

        let mut state = LendingState::new(params, RngManager::new(1));
        state
            .set_applicant(Applicant {
                features,
                group: vec![1],
                will_default,
            })
            .unwrap();
        state
    }

    fn weights(state: &LendingState) -> Vec<f64> {
        state
            .params()
            .applicant_distribution
            .cluster_weights(0)
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_target_cluster_saturates() {
        assert_eq!(target_cluster(0, 7, true), 0);
        assert_eq!(target_cluster(6, 7, false), 6);
        assert_eq!(target_cluster(3, 7, false), 4);
        assert_eq!(target_cluster(3, 7, true), 2);
    }

    #[test]
    fn test_repayment_moves_mass_up() {
        let mut state = state_at(vec![0.5, 0.3, 0.2], 1, false);
        CreditShiftUpdater.update(&mut state, LoanDecision::Accept).unwrap();

        let w = weights(&state);
        assert!(w[1].abs() < 1e-12, "cluster 1 should be drained, got {}", w[1]);
        assert!((w[2] - 0.5).abs() < 1e-12);
        assert_eq!(w[0], 0.5);
    }

    #[test]
    fn test_repayment_shift_capped_at_increment() {
        let mut state = state_at(vec![0.5, 0.3, 0.2], 0, false);
        CreditShiftUpdater.update(&mut state, LoanDecision::Accept).unwrap();
        let w = weights(&state);
        assert!((w[0] - 0.1).abs() < 1e-12);
        assert!((w[1] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_top_cluster_repayment_is_noop() {
        let mut state = state_at(vec![0.5, 0.3, 0.2], 2, false);
        CreditShiftUpdater.update(&mut state, LoanDecision::Accept).unwrap();
        assert_eq!(weights(&state), vec![0.5, 0.3, 0.2]);
    }

    #[test]
    fn test_bottom_cluster_default_is_noop() {
        let mut state = state_at(vec![0.5, 0.3, 0.2], 0, true);
        CreditShiftUpdater.update(&mut state, LoanDecision::Accept).unwrap();
        assert_eq!(weights(&state), vec![0.5, 0.3, 0.2]);
    }

    #[test]
    fn test_reject_leaves_weights() {
        let mut state = state_at(vec![0.5, 0.3, 0.2], 1, true);
        CreditShiftUpdater.update(&mut state, LoanDecision::Reject).unwrap();
        assert_eq!(weights(&state), vec![0.5, 0.3, 0.2]);
    }

    #[test]
    fn test_check_params_requires_ordered_clusters() {
        assert!(CreditShiftUpdater
            .check_params(&LendingParams::delayed_impact().unwrap())
            .is_ok());
        assert!(matches!(
            CreditShiftUpdater.check_params(&LendingParams::simple_loans().unwrap()),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_mass_cluster_fails_fast() {
        let mut state = state_at(vec![0.0, 0.5, 0.5], 0, false);
        let result = CreditShiftUpdater.update(&mut state, LoanDecision::Accept);
        assert!(matches!(
            result,
            Err(SimulationError::EmptyCluster { group: 0, cluster: 0 })
        ));
        assert_eq!(weights(&state), vec![0.0, 0.5, 0.5]);
    }
}
