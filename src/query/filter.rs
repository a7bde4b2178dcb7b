use crate::bookmarks::BookmarkSet;
use crate::catalog::Programme;
use crate::query::FilterSpec;

/// Apply a conjunction of predicates over a programme collection. Pure and
/// order-preserving: survivors keep their relative input order.
///
/// An inverted AGP range (`floor > ceiling`) is a defined edge case that
/// yields an empty result rather than an error.
pub fn filter_programmes(
    programmes: &[Programme],
    spec: &FilterSpec,
    bookmarks: &BookmarkSet,
) -> Vec<Programme> {
    if let (Some(floor), Some(ceiling)) = (spec.min_agp_floor, spec.min_agp_ceiling) {
        if floor > ceiling {
            return Vec::new();
        }
    }

    let needle = spec
        .search_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);

    programmes
        .iter()
        .filter(|p| matches(p, spec, needle.as_deref(), bookmarks))
        .cloned()
        .collect()
}

fn matches(
    programme: &Programme,
    spec: &FilterSpec,
    needle: Option<&str>,
    bookmarks: &BookmarkSet,
) -> bool {
    if let Some(needle) = needle {
        let hit = contains_ci(Some(programme.name.as_str()), needle)
            || contains_ci(programme.university_name.as_deref(), needle)
            || contains_ci(programme.level.as_deref(), needle);
        if !hit {
            return false;
        }
    }
    if let Some(level) = spec.level.as_deref() {
        if programme.level.as_deref() != Some(level) {
            return false;
        }
    }
    if let Some(cluster_id) = spec.cluster_id {
        if !programme.belongs_to(cluster_id) {
            return false;
        }
    }
    // Missing data never fails a numeric range check.
    if let Some(min_agp) = programme.min_agp {
        if spec.min_agp_floor.is_some_and(|floor| min_agp < floor) {
            return false;
        }
        if spec.min_agp_ceiling.is_some_and(|ceiling| min_agp > ceiling) {
            return false;
        }
    }
    if spec.require_helb && !programme.helb_eligible {
        return false;
    }
    if spec.require_scholarship && !programme.scholarship_available {
        return false;
    }
    if spec.bookmarked_only && !bookmarks.contains(programme.programme_id) {
        return false;
    }
    true
}

fn contains_ci(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle_lower))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSnapshot;

    fn sample_programmes() -> Vec<Programme> {
        CatalogSnapshot::sample().programmes
    }

    #[test]
    fn empty_spec_keeps_everything_in_order() {
        let programmes = sample_programmes();
        let filtered = filter_programmes(&programmes, &FilterSpec::default(), &BookmarkSet::new());
        assert_eq!(filtered, programmes);
    }

    #[test]
    fn search_matches_name_university_or_level() {
        let programmes = sample_programmes();
        let spec = FilterSpec {
            search_text: Some("comp".to_string()),
            ..FilterSpec::default()
        };
        let filtered = filter_programmes(&programmes, &spec, &BookmarkSet::new());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "BSc Computer Science");

        let spec = FilterSpec {
            search_text: Some("nairobi".to_string()),
            ..FilterSpec::default()
        };
        let filtered = filter_programmes(&programmes, &spec, &BookmarkSet::new());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Bachelor of Commerce");
    }

    #[test]
    fn blank_search_text_is_equivalent_to_absent() {
        let programmes = sample_programmes();
        let spec = FilterSpec {
            search_text: Some("   ".to_string()),
            ..FilterSpec::default()
        };
        let filtered = filter_programmes(&programmes, &spec, &BookmarkSet::new());
        assert_eq!(filtered.len(), programmes.len());
    }

    #[test]
    fn search_and_level_combine_as_conjunction() {
        let programmes = sample_programmes();
        let spec = FilterSpec {
            search_text: Some("comp".to_string()),
            level: Some("Diploma".to_string()),
            ..FilterSpec::default()
        };
        let filtered = filter_programmes(&programmes, &spec, &BookmarkSet::new());
        assert!(filtered.is_empty());
    }

    #[test]
    fn helb_flag_keeps_only_helb_programmes() {
        let programmes = sample_programmes();
        let spec = FilterSpec {
            require_helb: true,
            ..FilterSpec::default()
        };
        let filtered = filter_programmes(&programmes, &spec, &BookmarkSet::new());
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|p| p.helb_eligible));
    }

    #[test]
    fn absent_min_agp_survives_range_filters() {
        let programmes = sample_programmes();
        let spec = FilterSpec {
            min_agp_floor: Some(7.0),
            ..FilterSpec::default()
        };
        let filtered = filter_programmes(&programmes, &spec, &BookmarkSet::new());
        assert!(filtered.iter().any(|p| p.min_agp.is_none()));
        assert!(!filtered.iter().any(|p| p.min_agp.is_some_and(|v| v < 7.0)));
    }

    #[test]
    fn inverted_range_yields_empty_result() {
        let programmes = sample_programmes();
        let spec = FilterSpec {
            min_agp_floor: Some(9.0),
            min_agp_ceiling: Some(5.0),
            ..FilterSpec::default()
        };
        assert!(filter_programmes(&programmes, &spec, &BookmarkSet::new()).is_empty());
    }

    #[test]
    fn bookmarked_only_requires_membership() {
        let programmes = sample_programmes();
        let bookmarks = BookmarkSet::new().toggle(103);
        let spec = FilterSpec {
            bookmarked_only: true,
            ..FilterSpec::default()
        };
        let filtered = filter_programmes(&programmes, &spec, &bookmarks);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].programme_id, 103);
    }

    #[test]
    fn filtering_is_idempotent() {
        let programmes = sample_programmes();
        let bookmarks = BookmarkSet::new();
        let spec = FilterSpec {
            search_text: Some("b".to_string()),
            min_agp_floor: Some(4.0),
            ..FilterSpec::default()
        };
        let once = filter_programmes(&programmes, &spec, &bookmarks);
        let twice = filter_programmes(&once, &spec, &bookmarks);
        assert_eq!(once, twice);
    }

    #[test]
    fn conjunction_equals_sequential_application() {
        let programmes = sample_programmes();
        let bookmarks = BookmarkSet::new();
        let search_only = FilterSpec {
            search_text: Some("b".to_string()),
            ..FilterSpec::default()
        };
        let level_only = FilterSpec {
            level: Some("Degree".to_string()),
            ..FilterSpec::default()
        };
        let both = FilterSpec {
            search_text: Some("b".to_string()),
            level: Some("Degree".to_string()),
            ..FilterSpec::default()
        };
        let sequential = filter_programmes(
            &filter_programmes(&programmes, &search_only, &bookmarks),
            &level_only,
            &bookmarks,
        );
        let combined = filter_programmes(&programmes, &both, &bookmarks);
        assert_eq!(sequential, combined);
    }
}
