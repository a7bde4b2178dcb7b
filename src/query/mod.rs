pub mod filter;
pub mod group;
pub mod sort;

use serde::{Deserialize, Serialize};

/// Conjunction of browse predicates. Every field is optional; an absent
/// field never excludes a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterSpec {
    pub search_text: Option<String>,
    pub level: Option<String>,
    pub cluster_id: Option<u64>,
    pub min_agp_floor: Option<f64>,
    pub min_agp_ceiling: Option<f64>,
    #[serde(default)]
    pub require_helb: bool,
    #[serde(default)]
    pub require_scholarship: bool,
    #[serde(default)]
    pub bookmarked_only: bool,
}
