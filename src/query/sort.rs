use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Programme;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    NameAsc,
    NameDesc,
    UniversityAsc,
    UniversityDesc,
    MinAgpAsc,
    MinAgpDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::NameAsc,
        SortKey::NameDesc,
        SortKey::UniversityAsc,
        SortKey::UniversityDesc,
        SortKey::MinAgpAsc,
        SortKey::MinAgpDesc,
    ];
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::UniversityAsc => "university-asc",
            Self::UniversityDesc => "university-desc",
            Self::MinAgpAsc => "min-agp-asc",
            Self::MinAgpDesc => "min-agp-desc",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown sort key: {0}")]
pub struct SortKeyParseError(pub String);

impl FromStr for SortKey {
    type Err = SortKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "name" | "name-asc" => Ok(Self::NameAsc),
            "name-desc" => Ok(Self::NameDesc),
            "university" | "university-asc" => Ok(Self::UniversityAsc),
            "university-desc" => Ok(Self::UniversityDesc),
            "min-agp" | "min-agp-asc" | "agp" | "agp-asc" => Ok(Self::MinAgpAsc),
            "min-agp-desc" | "agp-desc" => Ok(Self::MinAgpDesc),
            _ => Err(SortKeyParseError(s.to_string())),
        }
    }
}

/// Return a new list ordered by the key. The underlying sort is stable, so
/// programmes with equal keys keep their relative input order and repeated
/// calls are reproducible.
pub fn sort_programmes(programmes: &[Programme], key: SortKey) -> Vec<Programme> {
    let mut sorted = programmes.to_vec();
    sorted.sort_by(|a, b| compare(a, b, key));
    sorted
}

fn compare(a: &Programme, b: &Programme, key: SortKey) -> Ordering {
    match key {
        SortKey::NameAsc => compare_ci(&a.name, &b.name),
        SortKey::NameDesc => compare_ci(&b.name, &a.name),
        SortKey::UniversityAsc => {
            compare_ci_opt(a.university_name.as_deref(), b.university_name.as_deref())
        }
        SortKey::UniversityDesc => {
            compare_ci_opt(b.university_name.as_deref(), a.university_name.as_deref())
        }
        // Absent AGP sorts as 0, the lowest value. This intentionally
        // differs from the filter's "absent is never excluded" policy.
        SortKey::MinAgpAsc => agp_or_zero(a).total_cmp(&agp_or_zero(b)),
        SortKey::MinAgpDesc => agp_or_zero(b).total_cmp(&agp_or_zero(a)),
    }
}

fn compare_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_ci_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
    compare_ci(a.unwrap_or_default(), b.unwrap_or_default())
}

fn agp_or_zero(programme: &Programme) -> f64 {
    programme.min_agp.unwrap_or(0.0)
}
