use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Programme;
use crate::eligibility::EligibilityReport;

/// One persisted eligibility check. History lives in the application layer;
/// the evaluator itself stores nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub index_number: String,
    pub programme_id: u64,
    pub programme_name: String,
    pub eligible: bool,
    pub unmet_count: usize,
    pub checked_at: DateTime<Utc>,
}

pub fn record_from_report(
    index_number: impl Into<String>,
    programme: &Programme,
    report: &EligibilityReport,
) -> CheckRecord {
    CheckRecord {
        index_number: index_number.into(),
        programme_id: programme.programme_id,
        programme_name: programme.name.clone(),
        eligible: report.is_eligible,
        unmet_count: report.unmet.len(),
        checked_at: Utc::now(),
    }
}

pub fn summarize_history(records: &[CheckRecord], programme_id: Option<u64>) -> String {
    if records.is_empty() {
        return "No check history found.".to_string();
    }

    let mut eligible_count = 0usize;
    let mut total = 0usize;
    for record in records {
        if let Some(programme_id) = programme_id {
            if record.programme_id != programme_id {
                continue;
            }
        }
        total += 1;
        if record.eligible {
            eligible_count += 1;
        }
    }

    if total == 0 {
        return "No matching records for selected programme.".to_string();
    }

    format!(
        "Eligible in {eligible_count}/{total} checks ({:.1}%)",
        (eligible_count as f64 / total as f64) * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(programme_id: u64, eligible: bool) -> CheckRecord {
        CheckRecord {
            index_number: "12345678".to_string(),
            programme_id,
            programme_name: "BSc Computer Science".to_string(),
            eligible,
            unmet_count: usize::from(!eligible),
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn summary_counts_matching_records() {
        let records = vec![record(101, true), record(101, false), record(102, true)];
        let summary = summarize_history(&records, Some(101));
        assert!(summary.contains("1/2"));
        let all = summarize_history(&records, None);
        assert!(all.contains("2/3"));
    }

    #[test]
    fn summary_handles_empty_history() {
        assert_eq!(summarize_history(&[], None), "No check history found.");
    }
}
