//! Observation and action space descriptors
//!
//! Shape and bounds metadata for the episode-loop framework. These describe
//! the state; they do not enforce anything.

use crate::models::LendingParams;
use serde::{Deserialize, Serialize};

/// Continuous box with uniform scalar bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: f64,
    pub high: f64,
    /// Empty for scalars
    pub shape: Vec<usize>,
}

impl BoxSpace {
    /// Whether every element of `values` lies in `[low, high]`
    pub fn contains(&self, values: &[f64]) -> bool {
        let expected_len: usize = self.shape.iter().product();
        values.len() == expected_len && values.iter().all(|v| (self.low..=self.high).contains(v))
    }
}

/// Space of applicant feature vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeatureSpace {
    /// Continuous features clipped into the observation bounds
    Box(BoxSpace),

    /// One trial over `n` categories: exactly one entry is 1, the rest 0
    OneHot { n: usize },
}

impl FeatureSpace {
    pub fn dim(&self) -> usize {
        match self {
            FeatureSpace::Box(space) => space.shape.iter().product(),
            FeatureSpace::OneHot { n } => *n,
        }
    }

    pub fn contains(&self, values: &[f64]) -> bool {
        match self {
            FeatureSpace::Box(space) => space.contains(values),
            FeatureSpace::OneHot { n } => {
                values.len() == *n
                    && values.iter().all(|v| *v == 0.0 || *v == 1.0)
                    && values.iter().filter(|v| **v == 1.0).count() == 1
            }
        }
    }
}

/// Observable state variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpace {
    /// Bank cash in `[0, max_cash]`
    pub bank_cash: BoxSpace,

    /// Applicant features: a box in `[min_observation, max_observation]^dim`,
    /// or one-hot when every cluster emits one-hot credit scores
    pub applicant_features: FeatureSpace,

    /// Multi-binary group membership, one entry per group
    pub group: usize,
}

impl ObservationSpace {
    pub fn for_params(params: &LendingParams) -> Self {
        Self {
            bank_cash: BoxSpace {
                low: 0.0,
                high: params.max_cash,
                shape: Vec::new(),
            },
            applicant_features: Self::feature_space(params),
            group: params.num_groups(),
        }
    }

    fn feature_space(params: &LendingParams) -> FeatureSpace {
        let dim = params.applicant_distribution.feature_dim();
        if params.applicant_distribution.emits_one_hot() {
            FeatureSpace::OneHot { n: dim }
        } else {
            FeatureSpace::Box(BoxSpace {
                low: params.min_observation,
                high: params.max_observation,
                shape: vec![dim],
            })
        }
    }
}

/// Discrete action space: 0 = reject, 1 = accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub n: usize,
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self { n: 2 }
    }
}

impl ActionSpace {
    pub fn contains(&self, action: i64) -> bool {
        action >= 0 && (action as usize) < self.n
    }
}
