//! Lending Parameters
//!
//! The immutable initial-parameters template an environment is built from,
//! plus the built-in templates for each environment variant.
//!
//! The environment never mutates a template. Every episode works on a clone
//! (see [`crate::models::state::LendingState`]), so feedback on cluster
//! weights never leaks across episodes.

use crate::environment::SimulationError;
use crate::models::population::{
    ClusterComponent, ClusterMixture, ClusterWeights, FeatureDistribution, GroupSpec,
    PopulationError, PopulationModel,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Cluster weights per group for the delayed-impact population.
///
/// Seven credit-score clusters, lowest score first. Group 1 starts with its
/// mass concentrated in lower clusters.
pub const DELAYED_IMPACT_CLUSTER_PROBS: [[f64; 7]; 2] = [
    [0.0, 0.1, 0.1, 0.2, 0.3, 0.3, 0.0],
    [0.1, 0.1, 0.2, 0.3, 0.3, 0.0, 0.0],
];

/// Repayment probability of each delayed-impact credit-score cluster
pub const DELAYED_IMPACT_SUCCESS_PROBS: [f64; 7] = [0.1, 0.2, 0.45, 0.6, 0.65, 0.7, 0.7];

fn invalid_config(err: PopulationError) -> SimulationError {
    SimulationError::InvalidConfig(err.to_string())
}

/// Complete parameter set for one lending environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingParams {
    /// Amount lent per accepted applicant
    pub loan_amount: f64,

    /// Fraction of `loan_amount` earned when a loan is repaid
    pub interest_rate: f64,

    /// Bank cash at the start of every episode
    pub bank_starting_cash: f64,

    /// Upper bound advertised for bank cash in the observation space
    pub max_cash: f64,

    /// Element-wise lower bound applied to sampled features
    pub min_observation: f64,

    /// Element-wise upper bound applied to sampled features
    pub max_observation: f64,

    /// Probability mass moved per accepted applicant under credit-shift feedback
    pub cluster_shift_increment: f64,

    /// Generator for applicants
    pub applicant_distribution: PopulationModel,
}

impl LendingParams {
    /// Two groups that express creditworthiness identically in 2-D features
    pub fn simple_loans() -> Result<Self, SimulationError> {
        let creditworthy = [1.0, 1.0];
        let risky = [-1.0, -1.0];
        Self::two_feature_template([(creditworthy, risky), (creditworthy, risky)])
    }

    /// Two groups whose creditworthiness shows up along different feature axes
    pub fn differential_expression() -> Result<Self, SimulationError> {
        Self::two_feature_template([([1.0, 1.0], [-1.0, -1.0]), ([1.0, -1.0], [-1.0, 1.0])])
    }

    /// Seven one-hot credit-score clusters per group, ordered lowest first
    pub fn delayed_impact() -> Result<Self, SimulationError> {
        let num_groups = DELAYED_IMPACT_CLUSTER_PROBS.len();
        let dim = DELAYED_IMPACT_SUCCESS_PROBS.len();

        let mut groups = Vec::with_capacity(num_groups);
        for (group_id, probs) in DELAYED_IMPACT_CLUSTER_PROBS.iter().enumerate() {
            let components = DELAYED_IMPACT_SUCCESS_PROBS
                .iter()
                .enumerate()
                .map(|(index, success)| {
                    ClusterComponent::new(FeatureDistribution::OneHot { index, dim }, 1.0 - success)
                })
                .collect();
            let weights = ClusterWeights::new(probs.to_vec()).map_err(invalid_config)?;
            groups.push(GroupSpec::new(
                group_id,
                num_groups,
                1.0 / num_groups as f64,
                ClusterMixture::new(weights, components),
            ));
        }

        let params = Self {
            loan_amount: 1.0,
            interest_rate: 1.0,
            bank_starting_cash: 100.0,
            max_cash: 1_000_000.0,
            min_observation: 0.0,
            max_observation: 1.0,
            cluster_shift_increment: 0.01,
            applicant_distribution: PopulationModel::new(groups).map_err(invalid_config)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Two-group, two-cluster Gaussian template.
    ///
    /// `means[g]` holds (creditworthy mean, risky mean) for group `g`.
    fn two_feature_template(means: [([f64; 2], [f64; 2]); 2]) -> Result<Self, SimulationError> {
        let num_groups = means.len();
        let mut groups = Vec::with_capacity(num_groups);

        for (group_id, (creditworthy, risky)) in means.iter().enumerate() {
            let components = vec![
                ClusterComponent::new(
                    FeatureDistribution::Gaussian {
                        mean: creditworthy.to_vec(),
                        std_dev: 0.5,
                    },
                    0.1,
                ),
                ClusterComponent::new(
                    FeatureDistribution::Gaussian {
                        mean: risky.to_vec(),
                        std_dev: 0.5,
                    },
                    0.7,
                ),
            ];
            groups.push(GroupSpec::new(
                group_id,
                num_groups,
                0.5,
                ClusterMixture::new(ClusterWeights::new(vec![0.5, 0.5]).map_err(invalid_config)?, components),
            ));
        }

        let params = Self {
            loan_amount: 1.0,
            interest_rate: 1.0,
            bank_starting_cash: 100.0,
            max_cash: 1_000_000.0,
            min_observation: -3.0,
            max_observation: 3.0,
            cluster_shift_increment: 0.01,
            applicant_distribution: PopulationModel::new(groups).map_err(invalid_config)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Load a template from JSON and validate it
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the JSON is malformed, the population model breaks
    /// its invariants, or any scalar parameter is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, SimulationError> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("Invalid params JSON: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json_string(&self) -> Result<String, SimulationError> {
        serde_json::to_string(self)
            .map_err(|e| SimulationError::InvalidConfig(format!("Cannot serialize params: {}", e)))
    }

    /// SHA-256 over the JSON encoding, hex-encoded
    ///
    /// Identifies which template a recorded trajectory was produced under.
    pub fn fingerprint(&self) -> Result<String, SimulationError> {
        let json = self.to_json_string()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Validate scalar parameters and the population model
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.loan_amount > 0.0) || !self.loan_amount.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "loan_amount must be positive and finite, got {}",
                self.loan_amount
            )));
        }

        if !(self.interest_rate >= 0.0) || !self.interest_rate.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "interest_rate must be >= 0 and finite, got {}",
                self.interest_rate
            )));
        }

        if !(self.bank_starting_cash >= 0.0) || self.bank_starting_cash > self.max_cash {
            return Err(SimulationError::InvalidConfig(format!(
                "bank_starting_cash {} must lie in [0, max_cash = {}]",
                self.bank_starting_cash, self.max_cash
            )));
        }

        if !(self.min_observation <= self.max_observation) {
            return Err(SimulationError::InvalidConfig(format!(
                "min_observation {} exceeds max_observation {}",
                self.min_observation, self.max_observation
            )));
        }

        if !(0.0..=1.0).contains(&self.cluster_shift_increment) {
            return Err(SimulationError::InvalidConfig(format!(
                "cluster_shift_increment {} outside [0, 1]",
                self.cluster_shift_increment
            )));
        }

        self.applicant_distribution.validate().map_err(invalid_config)
    }

    pub fn num_groups(&self) -> usize {
        self.applicant_distribution.num_groups()
    }
}
