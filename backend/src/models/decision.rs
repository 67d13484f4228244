//! Loan decision (the agent's action)

use serde::{Deserialize, Serialize};

/// Accept/reject decision on the current applicant
///
/// Discriminants match the discrete action indices exposed to the
/// episode-loop framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanDecision {
    Reject = 0,
    Accept = 1,
}

impl LoanDecision {
    /// Decode a discrete action index. Only 0 and 1 are valid.
    pub fn from_index(action: i64) -> Option<Self> {
        match action {
            0 => Some(LoanDecision::Reject),
            1 => Some(LoanDecision::Accept),
            _ => None,
        }
    }

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn is_accept(self) -> bool {
        self == LoanDecision::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for decision in [LoanDecision::Reject, LoanDecision::Accept] {
            assert_eq!(LoanDecision::from_index(decision.index()), Some(decision));
        }
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(LoanDecision::from_index(2), None);
        assert_eq!(LoanDecision::from_index(-1), None);
    }
}
