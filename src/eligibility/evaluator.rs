use crate::catalog::{CatalogSnapshot, Cluster, Programme, Transcript};
use crate::eligibility::{EligibilityReport, UnmetRequirement};

/// Check a programme's cluster-subject requirements against a transcript.
///
/// Total and pure: a programme with zero clusters has nothing to fail and is
/// eligible. Subjects missing from the transcript count as 0 points. Within
/// each cluster, per-subject shortfalls are emitted in the cluster's subject
/// order, followed by the cluster-total shortfall when the summed points also
/// fall short; both kinds can fire for the same cluster. Clusters are visited
/// in the order given, which callers supply as the programme's own membership
/// order.
///
/// `alternative_group` is carried on subject requirements but substitution is
/// not applied; every subject is checked literally against its own code.
pub fn evaluate(
    programme: &Programme,
    clusters: &[Cluster],
    transcript: &Transcript,
) -> EligibilityReport {
    let mut unmet = Vec::new();

    for cluster in clusters {
        let mut required_total: u32 = 0;
        let mut actual_total: u32 = 0;

        for subject in &cluster.subjects {
            let actual = transcript
                .get(&subject.subject_code)
                .map(|result| result.points)
                .unwrap_or(0);
            required_total += subject.min_points;
            actual_total += actual;

            if actual < subject.min_points {
                unmet.push(UnmetRequirement::SubjectShortfall {
                    subject_name: subject.subject_name.clone(),
                    required: subject.min_points,
                    actual,
                });
            }
        }

        if actual_total < required_total {
            unmet.push(UnmetRequirement::ClusterShortfall {
                cluster_name: cluster.name.clone(),
                required_total,
                actual_total,
            });
        }
    }

    EligibilityReport {
        programme_id: programme.programme_id,
        is_eligible: unmet.is_empty(),
        unmet,
    }
}

/// Convenience wrapper that resolves the programme's clusters from a
/// snapshot before evaluating.
pub fn evaluate_in_snapshot(
    snapshot: &CatalogSnapshot,
    programme: &Programme,
    transcript: &Transcript,
) -> EligibilityReport {
    let clusters = snapshot.clusters_for(programme);
    evaluate(programme, &clusters, transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        transcript_from_results, ClusterSubject, StudentSubjectResult,
    };

    fn science_cluster() -> Cluster {
        Cluster {
            cluster_id: 1,
            code: "CL7".to_string(),
            name: "Science".to_string(),
            subjects: vec![
                ClusterSubject {
                    id: 11,
                    subject_code: "MAT".to_string(),
                    subject_name: "Mathematics".to_string(),
                    min_points: 7,
                    alternative_group: None,
                },
                ClusterSubject {
                    id: 12,
                    subject_code: "PHY".to_string(),
                    subject_name: "Physics".to_string(),
                    min_points: 6,
                    alternative_group: None,
                },
            ],
        }
    }

    fn cs_programme() -> Programme {
        Programme {
            programme_id: 101,
            name: "BSc Computer Science".to_string(),
            level: Some("Degree".to_string()),
            min_agp: Some(9.0),
            helb_eligible: true,
            scholarship_available: false,
            university_name: None,
            cluster_ids: vec![1],
        }
    }

    fn transcript(entries: &[(&str, u32)]) -> Transcript {
        transcript_from_results(
            entries
                .iter()
                .map(|(code, points)| StudentSubjectResult {
                    student_id: 1,
                    subject_code: (*code).to_string(),
                    subject_name: (*code).to_string(),
                    grade: String::new(),
                    points: *points,
                })
                .collect(),
        )
    }

    #[test]
    fn subject_shortfall_without_cluster_shortfall() {
        // Math 8 + Physics 5 = 13 meets the 13-point cluster total exactly,
        // so only the per-subject shortfall fires.
        let report = evaluate(
            &cs_programme(),
            &[science_cluster()],
            &transcript(&[("MAT", 8), ("PHY", 5)]),
        );
        assert!(!report.is_eligible);
        assert_eq!(
            report.unmet,
            vec![UnmetRequirement::SubjectShortfall {
                subject_name: "Physics".to_string(),
                required: 6,
                actual: 5,
            }]
        );
    }

    #[test]
    fn meeting_every_subject_is_eligible() {
        let report = evaluate(
            &cs_programme(),
            &[science_cluster()],
            &transcript(&[("MAT", 8), ("PHY", 7)]),
        );
        assert!(report.is_eligible);
        assert!(report.unmet.is_empty());
    }

    #[test]
    fn both_shortfall_kinds_fire_together() {
        let report = evaluate(
            &cs_programme(),
            &[science_cluster()],
            &transcript(&[("MAT", 4), ("PHY", 7)]),
        );
        assert!(!report.is_eligible);
        assert_eq!(report.subject_shortfall_count(), 1);
        assert_eq!(report.cluster_shortfall_count(), 1);
        // Subject shortfalls come first, the cluster total last.
        assert!(matches!(
            report.unmet.last(),
            Some(UnmetRequirement::ClusterShortfall {
                required_total: 13,
                actual_total: 11,
                ..
            })
        ));
    }

    #[test]
    fn missing_transcript_entries_count_as_zero() {
        let report = evaluate(&cs_programme(), &[science_cluster()], &transcript(&[]));
        assert_eq!(report.subject_shortfall_count(), 2);
        assert_eq!(report.cluster_shortfall_count(), 1);
        assert!(matches!(
            report.unmet[0],
            UnmetRequirement::SubjectShortfall { actual: 0, .. }
        ));
    }

    #[test]
    fn zero_clusters_is_trivially_eligible() {
        let mut programme = cs_programme();
        programme.cluster_ids.clear();
        let report = evaluate(&programme, &[], &transcript(&[]));
        assert!(report.is_eligible);
        assert!(report.unmet.is_empty());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let programme = cs_programme();
        let clusters = [science_cluster()];
        let transcript = transcript(&[("MAT", 5), ("PHY", 3)]);
        let first = evaluate(&programme, &clusters, &transcript);
        let second = evaluate(&programme, &clusters, &transcript);
        assert_eq!(first, second);
    }

    #[test]
    fn raising_points_never_adds_shortfalls() {
        let programme = cs_programme();
        let clusters = [science_cluster()];
        for base_mat in 0..=12u32 {
            for base_phy in 0..=12u32 {
                let before = evaluate(
                    &programme,
                    &clusters,
                    &transcript(&[("MAT", base_mat), ("PHY", base_phy)]),
                );
                let after = evaluate(
                    &programme,
                    &clusters,
                    &transcript(&[("MAT", base_mat + 1), ("PHY", base_phy)]),
                );
                assert!(after.unmet.len() <= before.unmet.len());
            }
        }
    }

    #[test]
    fn unmet_entries_group_by_cluster_in_programme_order() {
        let mut second = science_cluster();
        second.cluster_id = 2;
        second.name = "Applied Science".to_string();
        let mut programme = cs_programme();
        programme.cluster_ids = vec![1, 2];

        let report = evaluate(
            &programme,
            &[science_cluster(), second],
            &transcript(&[("MAT", 0), ("PHY", 0)]),
        );
        let cluster_names: Vec<&str> = report
            .unmet
            .iter()
            .filter_map(|u| match u {
                UnmetRequirement::ClusterShortfall { cluster_name, .. } => {
                    Some(cluster_name.as_str())
                }
                UnmetRequirement::SubjectShortfall { .. } => None,
            })
            .collect();
        assert_eq!(cluster_names, vec!["Science", "Applied Science"]);
    }
}
