//! Population Model
//!
//! Hierarchical mixture that generates loan applicants:
//!
//! ```text
//! PopulationModel
//!   ├── group 0 (likelihood, one-hot identity, ClusterMixture)
//!   │     ├── cluster 0 (weight, ClusterComponent)
//!   │     └── cluster k ...
//!   └── group n ...
//! ```
//!
//! # Critical Invariants
//!
//! 1. **Normalization**: every group's cluster weights sum to 1 within
//!    [`WEIGHT_TOLERANCE`]
//! 2. **Non-negativity**: no cluster weight is ever negative
//! 3. **Clone boundary**: cloning the model copies the weights (per-episode
//!    state) but shares component definitions and group identity vectors
//!    (immutable for the model's lifetime)
//!
//! # Draw Order
//!
//! `sample` consumes the RNG in a fixed order: group choice, cluster choice,
//! feature draw, then default outcome. Replaying a logged seed reproduces the
//! same applicant stream.

use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Tolerance used when checking that a mixture's weights sum to 1
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Errors raised by population-model validation and mass shifts
///
/// Every variant indicates a misconfigured or corrupted model. None of them
/// is a transient condition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PopulationError {
    #[error("Population model has no groups")]
    NoGroups,

    #[error("Group {group} has no clusters")]
    NoClusters { group: usize },

    #[error("Group {group} not found (population has {num_groups} groups)")]
    GroupNotFound { group: usize, num_groups: usize },

    #[error("Cluster {cluster} out of range (group has {num_clusters} clusters)")]
    ClusterOutOfRange { cluster: usize, num_clusters: usize },

    #[error("Weights sum to {sum}, expected 1")]
    WeightsNotNormalized { sum: f64 },

    #[error("Weight {weight} at index {index} is negative")]
    NegativeWeight { index: usize, weight: f64 },

    #[error("Shift amount {0} is negative")]
    NegativeShift(f64),

    #[error("Cannot shift {amount} from cluster {from}: only {available} available")]
    InsufficientMass {
        from: usize,
        amount: f64,
        available: f64,
    },

    #[error("Group {group} has {weights} weights but {components} components")]
    ClusterCountMismatch {
        group: usize,
        weights: usize,
        components: usize,
    },

    #[error("Group {group} membership {membership:?} is not one-hot")]
    MembershipNotOneHot { group: usize, membership: Vec<u8> },

    #[error("Group {group} membership vector has length {actual}, expected {expected}")]
    MembershipLength {
        group: usize,
        actual: usize,
        expected: usize,
    },

    #[error("Feature dimension mismatch: expected {expected}, found {actual}")]
    FeatureDimMismatch { expected: usize, actual: usize },

    #[error("Invalid component in group {group}, cluster {cluster}: {reason}")]
    InvalidComponent {
        group: usize,
        cluster: usize,
        reason: String,
    },

    #[error("Cluster ordering broken: {0}")]
    ClusterOrdering(String),
}

/// Index of the first maximal element, matching numpy's `argmax`.
///
/// Returns `None` for an empty slice.
pub fn argmax<T: PartialOrd>(values: &[T]) -> Option<usize> {
    let mut best: Option<(usize, &T)> = None;
    for (idx, value) in values.iter().enumerate() {
        if best.map_or(true, |(_, current)| value > current) {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}

// ============================================================================
// Cluster Weights
// ============================================================================

/// Validated probability vector over the clusters of one group.
///
/// Construction and [`ClusterWeights::shifted`] are the only ways to obtain a
/// value, and both enforce normalization and non-negativity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ClusterWeights(Vec<f64>);

impl ClusterWeights {
    /// Validate and wrap a weight vector
    ///
    /// # Example
    /// ```
    /// use lending_simulator_core_rs::models::population::ClusterWeights;
    ///
    /// let weights = ClusterWeights::new(vec![0.5, 0.3, 0.2]).unwrap();
    /// assert_eq!(weights.len(), 3);
    /// assert!(ClusterWeights::new(vec![0.5, 0.6]).is_err());
    /// ```
    pub fn new(weights: Vec<f64>) -> Result<Self, PopulationError> {
        Self::check(&weights)?;
        Ok(Self(weights))
    }

    /// Check the mixture invariants on a raw weight slice
    pub fn check(weights: &[f64]) -> Result<(), PopulationError> {
        if let Some((index, weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !(**w >= 0.0))
        {
            return Err(PopulationError::NegativeWeight {
                index,
                weight: *weight,
            });
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() >= WEIGHT_TOLERANCE {
            return Err(PopulationError::WeightsNotNormalized { sum });
        }

        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Weight of cluster `index`
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// Return new weights with `amount` moved from cluster `from` to `to`.
    ///
    /// Pure: `self` is untouched, so a failed shift leaves the caller's
    /// mixture exactly as it was.
    ///
    /// # Errors
    ///
    /// - `ClusterOutOfRange` if either index is invalid
    /// - `NegativeShift` if `amount < 0`
    /// - `InsufficientMass` if `amount > weight[from]`
    /// - `NegativeWeight` / `WeightsNotNormalized` if the result breaks the
    ///   mixture invariants
    ///
    /// # Example
    /// ```
    /// use lending_simulator_core_rs::models::population::ClusterWeights;
    ///
    /// let weights = ClusterWeights::new(vec![0.5, 0.25, 0.25]).unwrap();
    /// let shifted = weights.shifted(0, 1, 0.25).unwrap();
    /// assert_eq!(shifted.as_slice(), &[0.25, 0.5, 0.25]);
    /// ```
    pub fn shifted(&self, from: usize, to: usize, amount: f64) -> Result<Self, PopulationError> {
        let num_clusters = self.0.len();
        for cluster in [from, to] {
            if cluster >= num_clusters {
                return Err(PopulationError::ClusterOutOfRange {
                    cluster,
                    num_clusters,
                });
            }
        }

        if !(amount >= 0.0) {
            return Err(PopulationError::NegativeShift(amount));
        }

        let available = self.0[from];
        if amount > available {
            return Err(PopulationError::InsufficientMass {
                from,
                amount,
                available,
            });
        }

        if from == to {
            return Ok(self.clone());
        }

        let mut weights = self.0.clone();
        weights[from] -= amount;
        weights[to] += amount;

        Self::new(weights)
    }
}

impl TryFrom<Vec<f64>> for ClusterWeights {
    type Error = PopulationError;

    fn try_from(weights: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(weights)
    }
}

impl From<ClusterWeights> for Vec<f64> {
    fn from(weights: ClusterWeights) -> Self {
        weights.0
    }
}

// ============================================================================
// Components
// ============================================================================

/// How a cluster generates applicant features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeatureDistribution {
    /// Isotropic Gaussian around `mean`; one standard normal per dimension
    Gaussian { mean: Vec<f64>, std_dev: f64 },

    /// Deterministic one-hot credit-score encoding; consumes no draws
    OneHot { index: usize, dim: usize },
}

impl FeatureDistribution {
    /// Dimensionality of the generated feature vector
    pub fn dim(&self) -> usize {
        match self {
            FeatureDistribution::Gaussian { mean, .. } => mean.len(),
            FeatureDistribution::OneHot { dim, .. } => *dim,
        }
    }

    /// Most likely feature vector (the mean for Gaussians)
    pub fn mode(&self) -> Vec<f64> {
        match self {
            FeatureDistribution::Gaussian { mean, .. } => mean.clone(),
            FeatureDistribution::OneHot { index, dim } => one_hot(*index, *dim),
        }
    }

    pub fn sample(&self, rng: &mut RngManager) -> Vec<f64> {
        match self {
            FeatureDistribution::Gaussian { mean, std_dev } => mean
                .iter()
                .map(|m| m + std_dev * rng.standard_normal())
                .collect(),
            FeatureDistribution::OneHot { index, dim } => one_hot(*index, *dim),
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            FeatureDistribution::Gaussian { mean, std_dev } => {
                if mean.is_empty() {
                    return Err("gaussian mean is empty".to_string());
                }
                if mean.iter().any(|m| !m.is_finite()) {
                    return Err("gaussian mean must be finite".to_string());
                }
                if !(*std_dev >= 0.0) || !std_dev.is_finite() {
                    return Err(format!("std_dev {} must be finite and >= 0", std_dev));
                }
            }
            FeatureDistribution::OneHot { index, dim } => {
                if index >= dim {
                    return Err(format!("one-hot index {} out of range for dim {}", index, dim));
                }
            }
        }
        Ok(())
    }
}

fn one_hot(index: usize, dim: usize) -> Vec<f64> {
    let mut features = vec![0.0; dim];
    features[index] = 1.0;
    features
}

/// One credit cluster: feature generator plus latent default likelihood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterComponent {
    pub features: FeatureDistribution,

    /// Probability an applicant drawn from this cluster defaults
    pub default_probability: f64,
}

impl ClusterComponent {
    pub fn new(features: FeatureDistribution, default_probability: f64) -> Self {
        Self {
            features,
            default_probability,
        }
    }

    /// Draw (features, will_default). Features are drawn first.
    pub fn sample(&self, rng: &mut RngManager) -> (Vec<f64>, bool) {
        let features = self.features.sample(rng);
        let will_default = rng.bernoulli(self.default_probability);
        (features, will_default)
    }
}

/// Weighted mixture over the credit clusters of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMixture {
    /// Per-episode mutable weights
    weights: ClusterWeights,

    /// Shared, immutable component definitions
    components: Arc<[ClusterComponent]>,
}

impl ClusterMixture {
    pub fn new(weights: ClusterWeights, components: Vec<ClusterComponent>) -> Self {
        Self {
            weights,
            components: components.into(),
        }
    }

    pub fn weights(&self) -> &ClusterWeights {
        &self.weights
    }

    pub fn components(&self) -> &[ClusterComponent] {
        &self.components
    }

    pub fn num_clusters(&self) -> usize {
        self.components.len()
    }

    /// True when both mixtures point at the same component allocation
    pub fn shares_components_with(&self, other: &ClusterMixture) -> bool {
        Arc::ptr_eq(&self.components, &other.components)
    }
}

/// One group of the population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Fixed probability of drawing this group
    pub likelihood: f64,

    /// One-hot group identity vector
    membership: Arc<[u8]>,

    pub clusters: ClusterMixture,
}

impl GroupSpec {
    /// Build group `index` of `num_groups`, with a one-hot membership vector
    ///
    /// An `index` outside `0..num_groups` yields an all-zero vector, which
    /// [`PopulationModel::validate`] rejects.
    pub fn new(index: usize, num_groups: usize, likelihood: f64, clusters: ClusterMixture) -> Self {
        let mut membership = vec![0u8; num_groups];
        if index < num_groups {
            membership[index] = 1;
        }
        Self {
            likelihood,
            membership: membership.into(),
            clusters,
        }
    }

    pub fn membership(&self) -> &[u8] {
        &self.membership
    }
}

/// One sampled loan applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub features: Vec<f64>,

    /// One-hot group membership
    pub group: Vec<u8>,

    /// Latent outcome if the loan were granted
    pub will_default: bool,
}

impl Applicant {
    /// Group index derived from the membership vector
    pub fn group_id(&self) -> Option<usize> {
        argmax(&self.group)
    }
}

// ============================================================================
// Population Model
// ============================================================================

/// Mixture over groups, each a mixture over credit clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GroupSpec>", into = "Vec<GroupSpec>")]
pub struct PopulationModel {
    groups: Vec<GroupSpec>,
}

impl PopulationModel {
    /// Build and validate a population model
    pub fn new(groups: Vec<GroupSpec>) -> Result<Self, PopulationError> {
        let model = Self { groups };
        model.validate()?;
        Ok(model)
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[GroupSpec] {
        &self.groups
    }

    /// Dimensionality of applicant features
    pub fn feature_dim(&self) -> usize {
        self.groups
            .first()
            .and_then(|g| g.clusters.components().first())
            .map(|c| c.features.dim())
            .unwrap_or(0)
    }

    /// True when every cluster emits one-hot credit-score features
    pub fn emits_one_hot(&self) -> bool {
        self.groups.iter().all(|g| {
            g.clusters
                .components()
                .iter()
                .all(|c| matches!(c.features, FeatureDistribution::OneHot { .. }))
        })
    }

    pub fn group(&self, group_id: usize) -> Result<&GroupSpec, PopulationError> {
        self.groups.get(group_id).ok_or(PopulationError::GroupNotFound {
            group: group_id,
            num_groups: self.groups.len(),
        })
    }

    /// Current cluster weights of a group
    pub fn cluster_weights(&self, group_id: usize) -> Result<&[f64], PopulationError> {
        Ok(self.group(group_id)?.clusters.weights().as_slice())
    }

    /// Draw one applicant
    ///
    /// Consumes the RNG in a fixed order: group choice, cluster choice,
    /// then the cluster component's feature and default draws.
    pub fn sample(&self, rng: &mut RngManager) -> Result<Applicant, PopulationError> {
        let likelihoods: Vec<f64> = self.groups.iter().map(|g| g.likelihood).collect();
        let group_id = rng
            .choose_weighted(&likelihoods)
            .ok_or(PopulationError::NoGroups)?;
        let group = &self.groups[group_id];

        let cluster_id = rng
            .choose_weighted(group.clusters.weights().as_slice())
            .ok_or(PopulationError::NoClusters { group: group_id })?;
        let component = &group.clusters.components()[cluster_id];

        let (features, will_default) = component.sample(rng);

        log::trace!(
            "Sampled applicant: group {} cluster {} will_default {}",
            group_id,
            cluster_id,
            will_default
        );

        Ok(Applicant {
            features,
            group: group.membership().to_vec(),
            will_default,
        })
    }

    /// Move `amount` of probability mass between two clusters of one group.
    ///
    /// The group's weights are replaced only if the shifted weights pass
    /// validation; on error the model is unchanged.
    pub fn shift_mass(
        &mut self,
        group_id: usize,
        from_cluster: usize,
        to_cluster: usize,
        amount: f64,
    ) -> Result<(), PopulationError> {
        let num_groups = self.groups.len();
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or(PopulationError::GroupNotFound {
                group: group_id,
                num_groups,
            })?;

        let shifted = group
            .clusters
            .weights
            .shifted(from_cluster, to_cluster, amount)?;
        group.clusters.weights = shifted;
        Ok(())
    }

    /// Check every structural and probabilistic invariant of the model
    pub fn validate(&self) -> Result<(), PopulationError> {
        if self.groups.is_empty() {
            return Err(PopulationError::NoGroups);
        }

        let likelihoods: Vec<f64> = self.groups.iter().map(|g| g.likelihood).collect();
        ClusterWeights::check(&likelihoods)?;

        let num_groups = self.groups.len();
        let feature_dim = self.feature_dim();

        for (group_id, group) in self.groups.iter().enumerate() {
            if group.membership.len() != num_groups {
                return Err(PopulationError::MembershipLength {
                    group: group_id,
                    actual: group.membership.len(),
                    expected: num_groups,
                });
            }
            let ones = group.membership.iter().filter(|m| **m == 1).count();
            let zeros = group.membership.iter().filter(|m| **m == 0).count();
            if ones != 1 || ones + zeros != num_groups {
                return Err(PopulationError::MembershipNotOneHot {
                    group: group_id,
                    membership: group.membership.to_vec(),
                });
            }

            let clusters = &group.clusters;
            if clusters.components.is_empty() {
                return Err(PopulationError::NoClusters { group: group_id });
            }
            if clusters.weights.len() != clusters.components.len() {
                return Err(PopulationError::ClusterCountMismatch {
                    group: group_id,
                    weights: clusters.weights.len(),
                    components: clusters.components.len(),
                });
            }
            ClusterWeights::check(clusters.weights.as_slice())?;

            for (cluster_id, component) in clusters.components.iter().enumerate() {
                let invalid = |reason: String| PopulationError::InvalidComponent {
                    group: group_id,
                    cluster: cluster_id,
                    reason,
                };

                component.features.check().map_err(|reason| invalid(reason))?;
                if !(0.0..=1.0).contains(&component.default_probability) {
                    return Err(invalid(format!(
                        "default_probability {} outside [0, 1]",
                        component.default_probability
                    )));
                }
                if component.features.dim() != feature_dim {
                    return Err(PopulationError::FeatureDimMismatch {
                        expected: feature_dim,
                        actual: component.features.dim(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Check that group and cluster indices line up with what they generate.
    ///
    /// Credit-shift feedback identifies an applicant's group by argmax of the
    /// membership vector and their cluster by argmax of the features, so
    /// group `g` must emit the one-hot of `g` and cluster `i` must emit
    /// features whose argmax is `i`.
    pub fn validate_cluster_ordering(&self) -> Result<(), PopulationError> {
        for (group_id, group) in self.groups.iter().enumerate() {
            if argmax(group.membership()) != Some(group_id) {
                return Err(PopulationError::ClusterOrdering(format!(
                    "group {} emits membership {:?}",
                    group_id,
                    group.membership()
                )));
            }

            for (cluster_id, component) in group.clusters.components().iter().enumerate() {
                let mode = component.features.mode();
                if argmax(&mode) != Some(cluster_id) {
                    return Err(PopulationError::ClusterOrdering(format!(
                        "group {} cluster {} emits features {:?}",
                        group_id, cluster_id, mode
                    )));
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<GroupSpec>> for PopulationModel {
    type Error = PopulationError;

    fn try_from(groups: Vec<GroupSpec>) -> Result<Self, Self::Error> {
        Self::new(groups)
    }
}

impl From<PopulationModel> for Vec<GroupSpec> {
    fn from(model: PopulationModel) -> Self {
        model.groups
    }
}
