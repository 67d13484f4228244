//! Episode history
//!
//! Append-only record of `(state, action)` pairs. Each state is the snapshot
//! the action was taken on, captured before that step's updates. Entries are
//! never mutated once appended.
//!
//! A history can be exported as a [`HistoryRecord`] tagged with the params
//! fingerprint, so analysis tools can check which template produced it.

use super::engine::SimulationError;
use crate::models::{LendingParams, LendingState, LoanDecision};
use serde::{Deserialize, Serialize};

/// One completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    state: LendingState,
    action: LoanDecision,
}

impl HistoryEntry {
    pub fn new(state: LendingState, action: LoanDecision) -> Self {
        Self { state, action }
    }

    /// State the action was taken on
    pub fn state(&self) -> &LendingState {
        &self.state
    }

    pub fn action(&self) -> LoanDecision {
        self.action
    }
}

/// Ordered, append-only step history of one episode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Bank cash before each recorded step
    pub fn cash_trajectory(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.state.bank_cash()).collect()
    }

    /// Export for analysis tools, tagged with the template fingerprint
    pub fn to_record(&self, params: &LendingParams) -> Result<HistoryRecord, SimulationError> {
        Ok(HistoryRecord {
            params_hash: params.fingerprint()?,
            entries: self.entries.clone(),
        })
    }
}

/// Serializable history export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// SHA-256 fingerprint of the params template
    pub params_hash: String,

    pub entries: Vec<HistoryEntry>,
}

impl HistoryRecord {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string(self)
            .map_err(|e| SimulationError::InvalidConfig(format!("Cannot serialize history: {}", e)))
    }

    /// Parse a record and check it was produced under `params`
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the JSON is malformed or the fingerprint differs.
    pub fn from_json(json: &str, params: &LendingParams) -> Result<Self, SimulationError> {
        let record: Self = serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("Invalid history JSON: {}", e)))?;

        let expected = params.fingerprint()?;
        if record.params_hash != expected {
            return Err(SimulationError::InvalidConfig(format!(
                "History was recorded under params {} but {} was supplied",
                record.params_hash, expected
            )));
        }

        Ok(record)
    }
}
