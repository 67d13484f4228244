//! Render data
//!
//! The renderer is an external collaborator; this module hands it the data
//! behind the "human" view: accepted applicants plotted by features and
//! outcome, the current applicant, and the cash trajectory.

use super::engine::{LendingEnv, SimulationError};
use crate::models::LendingState;
use serde::{Deserialize, Serialize};

/// The only supported render mode
pub const HUMAN_RENDER_MODE: &str = "human";

/// An applicant point in feature space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantPoint {
    pub x: f64,
    pub y: f64,
    pub group_id: usize,
    pub defaulted: bool,
}

/// Everything the "human" view draws
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderData {
    /// Applicants that were accepted, in step order
    pub accepted: Vec<ApplicantPoint>,

    /// Applicant awaiting a decision
    pub current: ApplicantPoint,

    /// Bank cash before each step, followed by current cash
    pub cash: Vec<f64>,
}

impl LendingEnv {
    /// Data for rendering in `mode`
    ///
    /// # Errors
    ///
    /// `UnsupportedRenderRequest` unless `mode == "human"` and features are
    /// exactly 2-dimensional. `NotReset` before the first reset.
    pub fn render_data(&self, mode: &str) -> Result<RenderData, SimulationError> {
        if mode != HUMAN_RENDER_MODE {
            return Err(SimulationError::UnsupportedRenderRequest(format!(
                "render mode '{}' (supported: '{}')",
                mode, HUMAN_RENDER_MODE
            )));
        }

        let dim = self.initial_params().applicant_distribution.feature_dim();
        if dim != 2 {
            return Err(SimulationError::UnsupportedRenderRequest(format!(
                "cannot render {}-dimensional applicant features, need exactly 2",
                dim
            )));
        }

        let state = self.state().ok_or(SimulationError::NotReset)?;

        let accepted = self
            .history()
            .iter()
            .filter(|entry| entry.action().is_accept())
            .filter_map(|entry| point(entry.state()))
            .collect();

        let current = point(state).ok_or(SimulationError::MissingApplicant)?;

        let mut cash = self.history().cash_trajectory();
        cash.push(state.bank_cash());

        Ok(RenderData {
            accepted,
            current,
            cash,
        })
    }
}

fn point(state: &LendingState) -> Option<ApplicantPoint> {
    match state.applicant_features()? {
        [x, y] => Some(ApplicantPoint {
            x: *x,
            y: *y,
            group_id: state.group_id()?,
            defaulted: state.will_default()?,
        }),
        _ => None,
    }
}
