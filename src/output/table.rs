use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::catalog::Programme;
use crate::eligibility::history::CheckRecord;
use crate::eligibility::{EligibilityReport, UnmetRequirement};
use crate::query::group::Bucket;

pub fn render_programmes_table(programmes: &[Programme]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID",
        "Programme",
        "University",
        "Level",
        "Min AGP",
        "HELB",
        "Scholarship",
    ]);

    for p in programmes {
        table.add_row(Row::from(vec![
            Cell::new(p.programme_id),
            Cell::new(&p.name),
            Cell::new(p.university_name.as_deref().unwrap_or("-")),
            Cell::new(p.level.as_deref().unwrap_or("-")),
            Cell::new(
                p.min_agp
                    .map(|v| format!("{v:.1}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(if p.helb_eligible { "yes" } else { "no" }),
            Cell::new(if p.scholarship_available { "yes" } else { "no" }),
        ]));
    }
    table.to_string()
}

pub fn render_buckets_table(buckets: &[Bucket]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Cluster", "Count", "Programmes"]);

    for bucket in buckets {
        let names = bucket
            .programmes
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            bucket.cluster_name.clone(),
            bucket.count.to_string(),
            names,
        ]);
    }
    table.to_string()
}

pub fn render_report_table(programme_name: &str, report: &EligibilityReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Programme", "Eligible", "Unmet Requirements"]);

    let verdict = if report.is_eligible { "YES" } else { "NO" };
    let verdict_cell = if report.is_eligible {
        Cell::new(verdict).fg(Color::Green)
    } else {
        Cell::new(verdict).fg(Color::Red)
    };
    table.add_row(Row::from(vec![
        Cell::new(programme_name),
        verdict_cell,
        Cell::new(report.unmet.len()),
    ]));

    if report.unmet.is_empty() {
        return table.to_string();
    }

    let mut detail = Table::new();
    detail
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    detail.set_header(vec!["Kind", "Requirement", "Required", "Actual"]);
    for unmet in &report.unmet {
        match unmet {
            UnmetRequirement::SubjectShortfall {
                subject_name,
                required,
                actual,
            } => {
                detail.add_row(vec![
                    "subject".to_string(),
                    subject_name.clone(),
                    required.to_string(),
                    actual.to_string(),
                ]);
            }
            UnmetRequirement::ClusterShortfall {
                cluster_name,
                required_total,
                actual_total,
            } => {
                detail.add_row(vec![
                    "cluster total".to_string(),
                    cluster_name.clone(),
                    required_total.to_string(),
                    actual_total.to_string(),
                ]);
            }
        }
    }
    format!("{table}\n{detail}")
}

pub fn render_history_table(records: &[CheckRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Checked At", "Programme", "Eligible", "Unmet"]);

    for record in records {
        let verdict = if record.eligible { "YES" } else { "NO" };
        let verdict_cell = if record.eligible {
            Cell::new(verdict).fg(Color::Green)
        } else {
            Cell::new(verdict).fg(Color::Red)
        };
        table.add_row(Row::from(vec![
            Cell::new(record.checked_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(&record.programme_name),
            verdict_cell,
            Cell::new(record.unmet_count),
        ]));
    }
    table.to_string()
}
