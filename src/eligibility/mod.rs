pub mod evaluator;
pub mod history;

use serde::{Deserialize, Serialize};

/// Outcome of checking one programme against a transcript. Derived, never
/// stored by the engine; recomputing with identical inputs yields an
/// identical report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibilityReport {
    pub programme_id: u64,
    pub is_eligible: bool,
    pub unmet: Vec<UnmetRequirement>,
}

impl EligibilityReport {
    pub fn subject_shortfall_count(&self) -> usize {
        self.unmet
            .iter()
            .filter(|u| matches!(u, UnmetRequirement::SubjectShortfall { .. }))
            .count()
    }

    pub fn cluster_shortfall_count(&self) -> usize {
        self.unmet
            .len()
            .saturating_sub(self.subject_shortfall_count())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnmetRequirement {
    SubjectShortfall {
        subject_name: String,
        required: u32,
        actual: u32,
    },
    ClusterShortfall {
        cluster_name: String,
        required_total: u32,
        actual_total: u32,
    },
}
