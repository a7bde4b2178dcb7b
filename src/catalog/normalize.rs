use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::{
    points_for_grade, Cluster, ClusterSubject, Programme, StudentSubjectResult, Transcript,
};

/// The only error the engine raises. Everything past the normalization
/// boundary is total over well-typed inputs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing identity field `{0}`")]
    MissingIdentity(&'static str),
    #[error("identity field `{field}` is not coercible to {expected}")]
    BadIdentityType {
        field: &'static str,
        expected: &'static str,
    },
}

/// A record that failed normalization, kept alongside the batch it came from.
#[derive(Debug, Clone)]
pub struct RecordFailure {
    pub index: usize,
    pub record: Value,
    pub error: MalformedRecordError,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch<T> {
    pub records: Vec<T>,
    pub failures: Vec<RecordFailure>,
}

pub fn normalize_programme(raw: &Value) -> Result<Programme, MalformedRecordError> {
    let object = as_object(raw)?;
    let programme_id = require_u64(object, "programme_id", &["programme_id", "programmeId", "id"])?;
    Ok(Programme {
        programme_id,
        name: opt_string(object, &["name", "programme_name", "programmeName"]).unwrap_or_default(),
        level: opt_string(object, &["level", "programme_level", "programmeLevel"]),
        min_agp: opt_f64(object, &["min_agp", "minAgp", "cutoff", "cutoff_points"]),
        helb_eligible: opt_bool(object, &["helb_eligible", "helbEligible", "helb"]),
        scholarship_available: opt_bool(
            object,
            &["scholarship_available", "scholarshipAvailable", "scholarship"],
        ),
        university_name: opt_string(object, &["university_name", "universityName", "university"]),
        cluster_ids: id_list(object, &["cluster_ids", "clusterIds", "clusters"]),
    })
}

pub fn normalize_cluster(raw: &Value) -> Result<Cluster, MalformedRecordError> {
    let object = as_object(raw)?;
    let cluster_id = require_u64(object, "cluster_id", &["cluster_id", "clusterId", "id"])?;
    let mut subjects = Vec::new();
    if let Some(Value::Array(entries)) =
        field(object, &["subjects", "cluster_subjects", "clusterSubjects"])
    {
        for entry in entries {
            // Subject rows are owned by the cluster record; a malformed
            // subject poisons the whole cluster record, not the batch.
            subjects.push(normalize_cluster_subject(entry)?);
        }
    }
    Ok(Cluster {
        cluster_id,
        code: opt_string(object, &["code", "cluster_code", "clusterCode"]).unwrap_or_default(),
        name: opt_string(object, &["name", "cluster_name", "clusterName"]).unwrap_or_default(),
        subjects,
    })
}

pub fn normalize_cluster_subject(raw: &Value) -> Result<ClusterSubject, MalformedRecordError> {
    let object = as_object(raw)?;
    let subject_code = require_string(object, "subject_code", &["subject_code", "subjectCode"])?;
    Ok(ClusterSubject {
        id: opt_u64(object, &["id", "cluster_subject_id"]).unwrap_or_default(),
        subject_name: opt_string(object, &["subject_name", "subjectName", "name"])
            .unwrap_or_else(|| subject_code.clone()),
        subject_code,
        min_points: opt_u64(object, &["min_points", "minPoints"]).unwrap_or(0) as u32,
        alternative_group: opt_u64(object, &["alternative_group", "alternativeGroup"])
            .map(|g| g as u32),
    })
}

pub fn normalize_subject_result(
    raw: &Value,
) -> Result<StudentSubjectResult, MalformedRecordError> {
    let object = as_object(raw)?;
    let subject_code = require_string(object, "subject_code", &["subject_code", "subjectCode"])?;
    let grade = opt_string(object, &["grade"]).unwrap_or_default();
    let points = opt_u64(object, &["points", "subject_points"])
        .map(|p| p as u32)
        .or_else(|| points_for_grade(&grade))
        .unwrap_or(0);
    Ok(StudentSubjectResult {
        student_id: opt_u64(object, &["student_id", "studentId"]).unwrap_or_default(),
        subject_name: opt_string(object, &["subject_name", "subjectName", "name"])
            .unwrap_or_else(|| subject_code.clone()),
        subject_code,
        grade,
        points,
    })
}

/// Normalize records independently: one malformed record is fatal to itself
/// but never aborts the batch.
pub fn normalize_batch<T>(
    raw: &[Value],
    normalize: impl Fn(&Value) -> Result<T, MalformedRecordError>,
) -> NormalizedBatch<T> {
    let mut batch = NormalizedBatch {
        records: Vec::with_capacity(raw.len()),
        failures: Vec::new(),
    };
    for (index, record) in raw.iter().enumerate() {
        match normalize(record) {
            Ok(normalized) => batch.records.push(normalized),
            Err(error) => batch.failures.push(RecordFailure {
                index,
                record: record.clone(),
                error,
            }),
        }
    }
    batch
}

pub fn normalize_programmes(raw: &[Value]) -> NormalizedBatch<Programme> {
    normalize_batch(raw, normalize_programme)
}

pub fn normalize_clusters(raw: &[Value]) -> NormalizedBatch<Cluster> {
    normalize_batch(raw, normalize_cluster)
}

pub fn normalize_transcript(raw: &[Value]) -> (Transcript, Vec<RecordFailure>) {
    let batch = normalize_batch(raw, normalize_subject_result);
    (
        crate::catalog::transcript_from_results(batch.records),
        batch.failures,
    )
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>, MalformedRecordError> {
    raw.as_object().ok_or(MalformedRecordError::NotAnObject)
}

fn field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        let hit = object.get(*alias).or_else(|| {
            object
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(alias))
                .map(|(_, v)| v)
        });
        if let Some(value) = hit {
            if !value.is_null() {
                return Some(value);
            }
        }
    }
    None
}

fn require_u64(
    object: &Map<String, Value>,
    canonical: &'static str,
    aliases: &[&str],
) -> Result<u64, MalformedRecordError> {
    let value = field(object, aliases).ok_or(MalformedRecordError::MissingIdentity(canonical))?;
    coerce_u64(value).ok_or(MalformedRecordError::BadIdentityType {
        field: canonical,
        expected: "integer",
    })
}

fn require_string(
    object: &Map<String, Value>,
    canonical: &'static str,
    aliases: &[&str],
) -> Result<String, MalformedRecordError> {
    let value = field(object, aliases).ok_or(MalformedRecordError::MissingIdentity(canonical))?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(MalformedRecordError::BadIdentityType {
            field: canonical,
            expected: "string",
        }),
    }
}

fn opt_string(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    match field(object, aliases)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn opt_f64(object: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    coerce_f64(field(object, aliases)?)
}

fn opt_u64(object: &Map<String, Value>, aliases: &[&str]) -> Option<u64> {
    coerce_u64(field(object, aliases)?)
}

fn opt_bool(object: &Map<String, Value>, aliases: &[&str]) -> bool {
    match field(object, aliases) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

fn id_list(object: &Map<String, Value>, aliases: &[&str]) -> Vec<u64> {
    let Some(Value::Array(entries)) = field(object, aliases) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(nested) => opt_u64(nested, &["cluster_id", "clusterId", "id"]),
            other => coerce_u64(other),
        })
        .collect()
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalizes_camel_case_programme_record() {
        let raw = json!({
            "programmeId": 7,
            "name": "BSc Computer Science",
            "minAgp": "9.5",
            "helbEligible": true,
            "universityName": "JKUAT",
            "clusters": [{"clusterId": 1}, {"clusterId": 2}]
        });
        let programme = normalize_programme(&raw).expect("record should normalize");
        assert_eq!(programme.programme_id, 7);
        assert_eq!(programme.min_agp, Some(9.5));
        assert!(programme.helb_eligible);
        assert_eq!(programme.cluster_ids, vec![1, 2]);
        assert_eq!(programme.level, None);
    }

    #[test]
    fn absent_optionals_stay_none_but_empty_strings_survive() {
        let raw = json!({"id": 1, "name": "X", "universityName": ""});
        let programme = normalize_programme(&raw).expect("record should normalize");
        assert_eq!(programme.university_name, Some(String::new()));
        assert_eq!(programme.level, None);
    }

    #[test]
    fn missing_identity_field_is_the_only_fatal_case() {
        let raw = json!({"name": "No id here"});
        let error = normalize_programme(&raw).expect_err("should fail");
        assert_eq!(error, MalformedRecordError::MissingIdentity("programme_id"));

        let raw = json!({"id": {"nested": true}, "name": "Bad id"});
        let error = normalize_programme(&raw).expect_err("should fail");
        assert!(matches!(
            error,
            MalformedRecordError::BadIdentityType { field: "programme_id", .. }
        ));
    }

    #[test]
    fn batch_collects_failures_without_aborting() {
        let raw = vec![
            json!({"id": 1, "name": "Good"}),
            json!({"name": "Bad"}),
            json!({"id": 3, "name": "Also good"}),
        ];
        let batch = normalize_programmes(&raw);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].index, 1);
    }

    #[test]
    fn cluster_subjects_normalize_in_order() {
        let raw = json!({
            "clusterId": 4,
            "code": "CL7",
            "name": "Science",
            "subjects": [
                {"subjectCode": "MAT", "subjectName": "Mathematics", "minPoints": 7},
                {"subjectCode": "PHY", "minPoints": 6, "alternativeGroup": 2}
            ]
        });
        let cluster = normalize_cluster(&raw).expect("cluster should normalize");
        assert_eq!(cluster.subjects.len(), 2);
        assert_eq!(cluster.subjects[0].subject_name, "Mathematics");
        assert_eq!(cluster.subjects[1].subject_name, "PHY");
        assert_eq!(cluster.subjects[1].alternative_group, Some(2));
    }

    #[test]
    fn transcript_points_fall_back_to_grade_scale() {
        let raw = vec![
            json!({"subjectCode": "MAT", "grade": "B", "points": 9}),
            json!({"subjectCode": "PHY", "grade": "C+"}),
        ];
        let (transcript, failures) = normalize_transcript(&raw);
        assert!(failures.is_empty());
        assert_eq!(transcript.get("PHY").map(|r| r.points), Some(7));
    }
}
