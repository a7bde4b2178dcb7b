use anyhow::Result;

use crate::catalog::Programme;
use crate::eligibility::{EligibilityReport, UnmetRequirement};

pub fn programmes_to_csv(programmes: &[Programme]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "programme_id",
        "name",
        "university",
        "level",
        "min_agp",
        "helb_eligible",
        "scholarship_available",
    ])?;
    for p in programmes {
        writer.write_record([
            p.programme_id.to_string(),
            p.name.clone(),
            p.university_name.clone().unwrap_or_default(),
            p.level.clone().unwrap_or_default(),
            p.min_agp.map(|v| format!("{v:.1}")).unwrap_or_default(),
            p.helb_eligible.to_string(),
            p.scholarship_available.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn report_to_csv(report: &EligibilityReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["kind", "requirement", "required", "actual", "eligible"])?;
    for unmet in &report.unmet {
        match unmet {
            UnmetRequirement::SubjectShortfall {
                subject_name,
                required,
                actual,
            } => {
                writer.write_record([
                    "subject".to_string(),
                    subject_name.clone(),
                    required.to_string(),
                    actual.to_string(),
                    report.is_eligible.to_string(),
                ])?;
            }
            UnmetRequirement::ClusterShortfall {
                cluster_name,
                required_total,
                actual_total,
            } => {
                writer.write_record([
                    "cluster_total".to_string(),
                    cluster_name.clone(),
                    required_total.to_string(),
                    actual_total.to_string(),
                    report.is_eligible.to_string(),
                ])?;
            }
        }
    }
    if report.unmet.is_empty() {
        writer.write_record([
            "none".to_string(),
            String::new(),
            String::new(),
            String::new(),
            report.is_eligible.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSnapshot;

    #[test]
    fn programmes_csv_has_header_and_rows() {
        let snapshot = CatalogSnapshot::sample();
        let csv = programmes_to_csv(&snapshot.programmes).expect("csv should render");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), snapshot.programmes.len() + 1);
        assert!(lines[0].starts_with("programme_id,name"));
    }

    #[test]
    fn eligible_report_still_emits_a_row() {
        let report = EligibilityReport {
            programme_id: 101,
            is_eligible: true,
            unmet: Vec::new(),
        };
        let csv = report_to_csv(&report).expect("csv should render");
        assert!(csv.contains("none"));
        assert!(csv.contains("true"));
    }
}
