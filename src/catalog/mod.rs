pub mod normalize;
pub mod source;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A programme as offered by a university. Catalog records are a read-only
/// snapshot; the engine never mutates them. `None` marks a field the upstream
/// record did not carry, which is distinct from an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Programme {
    pub programme_id: u64,
    pub name: String,
    pub level: Option<String>,
    pub min_agp: Option<f64>,
    #[serde(default)]
    pub helb_eligible: bool,
    #[serde(default)]
    pub scholarship_available: bool,
    pub university_name: Option<String>,
    #[serde(default)]
    pub cluster_ids: Vec<u64>,
}

impl Programme {
    pub fn belongs_to(&self, cluster_id: u64) -> bool {
        self.cluster_ids.contains(&cluster_id)
    }
}

/// A named group of subject requirements used to gate admission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub cluster_id: u64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<ClusterSubject>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSubject {
    pub id: u64,
    pub subject_code: String,
    pub subject_name: String,
    pub min_points: u32,
    pub alternative_group: Option<u32>,
}

/// One KCSE subject result. A full transcript is the complete set of these
/// for a student, keyed by subject code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentSubjectResult {
    #[serde(default)]
    pub student_id: u64,
    pub subject_code: String,
    pub subject_name: String,
    pub grade: String,
    pub points: u32,
}

pub type Transcript = BTreeMap<String, StudentSubjectResult>;

pub fn transcript_from_results(results: Vec<StudentSubjectResult>) -> Transcript {
    results
        .into_iter()
        .map(|r| (r.subject_code.clone(), r))
        .collect()
}

/// KCSE grade-to-points scale. Unknown grades yield `None`.
pub fn points_for_grade(grade: &str) -> Option<u32> {
    let points = match grade.trim().to_ascii_uppercase().as_str() {
        "A" => 12,
        "A-" => 11,
        "B+" => 10,
        "B" => 9,
        "B-" => 8,
        "C+" => 7,
        "C" => 6,
        "C-" => 5,
        "D+" => 4,
        "D" => 3,
        "D-" => 2,
        "E" => 1,
        _ => return None,
    };
    Some(points)
}

/// Programmes and clusters fetched together from one source, hashed for
/// snapshot identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    pub raw_hash: String,
    pub programmes: Vec<Programme>,
    pub clusters: Vec<Cluster>,
}

impl CatalogSnapshot {
    pub fn with_hash(
        source: impl Into<String>,
        programmes: Vec<Programme>,
        clusters: Vec<Cluster>,
    ) -> Self {
        let canonical =
            serde_json::to_string(&(&programmes, &clusters)).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let raw_hash = format!("{:x}", hasher.finalize());
        Self {
            fetched_at: Utc::now(),
            source: source.into(),
            raw_hash,
            programmes,
            clusters,
        }
    }

    pub fn programme(&self, programme_id: u64) -> Option<&Programme> {
        self.programmes
            .iter()
            .find(|p| p.programme_id == programme_id)
    }

    /// The clusters a programme belongs to, in the programme's own
    /// membership order. Unknown ids are skipped.
    pub fn clusters_for(&self, programme: &Programme) -> Vec<Cluster> {
        programme
            .cluster_ids
            .iter()
            .filter_map(|id| self.clusters.iter().find(|c| c.cluster_id == *id))
            .cloned()
            .collect()
    }

    /// Built-in demo catalog used when no API or fixture files are configured.
    pub fn sample() -> Self {
        let clusters = vec![
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
                    ClusterSubject {
                        id: 13,
                        subject_code: "CHE".to_string(),
                        subject_name: "Chemistry".to_string(),
                        min_points: 5,
                        alternative_group: None,
                    },
                ],
            },
            Cluster {
                cluster_id: 2,
                code: "CL12".to_string(),
                name: "Business".to_string(),
                subjects: vec![
                    ClusterSubject {
                        id: 21,
                        subject_code: "MAT".to_string(),
                        subject_name: "Mathematics".to_string(),
                        min_points: 6,
                        alternative_group: None,
                    },
                    ClusterSubject {
                        id: 22,
                        subject_code: "ENG".to_string(),
                        subject_name: "English".to_string(),
                        min_points: 6,
                        alternative_group: None,
                    },
                ],
            },
        ];
        let programmes = vec![
            Programme {
                programme_id: 101,
                name: "BSc Computer Science".to_string(),
                level: Some("Degree".to_string()),
                min_agp: Some(9.0),
                helb_eligible: true,
                scholarship_available: false,
                university_name: Some("Jomo Kenyatta University".to_string()),
                cluster_ids: vec![1],
            },
            Programme {
                programme_id: 102,
                name: "Bachelor of Commerce".to_string(),
                level: Some("Degree".to_string()),
                min_agp: Some(8.0),
                helb_eligible: true,
                scholarship_available: true,
                university_name: Some("University of Nairobi".to_string()),
                cluster_ids: vec![2],
            },
            Programme {
                programme_id: 103,
                name: "Diploma in Information Technology".to_string(),
                level: Some("Diploma".to_string()),
                min_agp: Some(5.0),
                helb_eligible: false,
                scholarship_available: false,
                university_name: Some("Kenyatta University".to_string()),
                cluster_ids: vec![1, 2],
            },
            Programme {
                programme_id: 104,
                name: "Certificate in Community Health".to_string(),
                level: None,
                min_agp: None,
                helb_eligible: false,
                scholarship_available: true,
                university_name: None,
                cluster_ids: Vec::new(),
            },
        ];
        Self::with_hash("builtin-sample", programmes, clusters)
    }
}

/// Demo transcript paired with [`CatalogSnapshot::sample`].
pub fn sample_transcript(student_id: u64) -> Transcript {
    let results = vec![
        StudentSubjectResult {
            student_id,
            subject_code: "MAT".to_string(),
            subject_name: "Mathematics".to_string(),
            grade: "B-".to_string(),
            points: 8,
        },
        StudentSubjectResult {
            student_id,
            subject_code: "PHY".to_string(),
            subject_name: "Physics".to_string(),
            grade: "C+".to_string(),
            points: 7,
        },
        StudentSubjectResult {
            student_id,
            subject_code: "CHE".to_string(),
            subject_name: "Chemistry".to_string(),
            grade: "C".to_string(),
            points: 6,
        },
        StudentSubjectResult {
            student_id,
            subject_code: "ENG".to_string(),
            subject_name: "English".to_string(),
            grade: "B".to_string(),
            points: 9,
        },
    ];
    transcript_from_results(results)
}
