use serde::{Deserialize, Serialize};

use crate::catalog::{Cluster, Programme};

pub const UNGROUPED_BUCKET: &str = "ungrouped";

/// A named partition of programmes: one cluster, or the ungrouped remainder
/// (`cluster_id: None`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub cluster_id: Option<u64>,
    pub cluster_name: String,
    pub count: usize,
    pub programmes: Vec<Programme>,
}

/// Partition programmes into per-cluster buckets plus an ungrouped remainder.
///
/// A programme with N cluster memberships appears in all N matching buckets;
/// bucket counts may therefore sum past the input length. Programmes matching
/// no known cluster land in the ungrouped bucket. Empty buckets are dropped,
/// and surviving buckets keep registration order: clusters in input order,
/// ungrouped last.
pub fn group_by_cluster(programmes: &[Programme], clusters: &[Cluster]) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = clusters
        .iter()
        .map(|cluster| Bucket {
            cluster_id: Some(cluster.cluster_id),
            cluster_name: cluster.name.clone(),
            count: 0,
            programmes: Vec::new(),
        })
        .collect();
    buckets.push(Bucket {
        cluster_id: None,
        cluster_name: UNGROUPED_BUCKET.to_string(),
        count: 0,
        programmes: Vec::new(),
    });

    for programme in programmes {
        let mut placed = false;
        for bucket in buckets.iter_mut() {
            let member = bucket
                .cluster_id
                .is_some_and(|id| programme.belongs_to(id));
            if member {
                bucket.programmes.push(programme.clone());
                bucket.count += 1;
                placed = true;
            }
        }
        if !placed {
            let ungrouped = buckets.last_mut().expect("ungrouped bucket always present");
            ungrouped.programmes.push(programme.clone());
            ungrouped.count += 1;
        }
    }

    buckets.retain(|bucket| bucket.count > 0);
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSnapshot;

    fn programme(id: u64, name: &str, cluster_ids: Vec<u64>) -> Programme {
        Programme {
            programme_id: id,
            name: name.to_string(),
            level: None,
            min_agp: None,
            helb_eligible: false,
            scholarship_available: false,
            university_name: None,
            cluster_ids,
        }
    }

    fn cluster(id: u64, name: &str) -> Cluster {
        Cluster {
            cluster_id: id,
            code: format!("CL{id}"),
            name: name.to_string(),
            subjects: Vec::new(),
        }
    }

    #[test]
    fn empty_buckets_are_dropped_and_order_is_preserved() {
        let clusters = vec![cluster(1, "A"), cluster(2, "B"), cluster(3, "C")];
        let programmes = vec![programme(10, "Multi", vec![1, 2])];
        let buckets = group_by_cluster(&programmes, &clusters);
        let names: Vec<&str> = buckets.iter().map(|b| b.cluster_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(buckets.iter().all(|b| b.count == 1));
    }

    #[test]
    fn multi_membership_appears_in_every_matching_bucket() {
        let snapshot = CatalogSnapshot::sample();
        let buckets = group_by_cluster(&snapshot.programmes, &snapshot.clusters);
        let appearances: usize = buckets
            .iter()
            .flat_map(|b| b.programmes.iter())
            .filter(|p| p.programme_id == 103)
            .count();
        assert_eq!(appearances, 2);
    }

    #[test]
    fn bucket_count_sum_is_at_least_programme_count() {
        let snapshot = CatalogSnapshot::sample();
        let buckets = group_by_cluster(&snapshot.programmes, &snapshot.clusters);
        let total: usize = buckets.iter().map(|b| b.count).sum();
        // The sample holds one two-cluster programme, so multi-membership
        // inflates the sum by exactly one.
        assert_eq!(total, snapshot.programmes.len() + 1);
        assert!(total >= snapshot.programmes.len());
    }

    #[test]
    fn clusterless_programmes_land_in_ungrouped_last() {
        let clusters = vec![cluster(1, "A")];
        let programmes = vec![
            programme(10, "In A", vec![1]),
            programme(11, "Orphan", Vec::new()),
        ];
        let buckets = group_by_cluster(&programmes, &clusters);
        assert_eq!(buckets.len(), 2);
        let last = buckets.last().expect("expected ungrouped bucket");
        assert_eq!(last.cluster_name, UNGROUPED_BUCKET);
        assert_eq!(last.cluster_id, None);
        assert_eq!(last.programmes[0].programme_id, 11);
    }

    #[test]
    fn unknown_cluster_membership_falls_back_to_ungrouped() {
        let clusters = vec![cluster(1, "A")];
        let programmes = vec![programme(10, "Stale membership", vec![99])];
        let buckets = group_by_cluster(&programmes, &clusters);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].cluster_name, UNGROUPED_BUCKET);
    }
}
