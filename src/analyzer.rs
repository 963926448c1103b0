use crate::models::{RankingFilter, SchoolRecord};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Classes of one school that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolGroup {
    pub school: String,
    pub classes: Vec<SchoolRecord>,
    pub min_threshold: f64,
    pub max_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSchool {
    pub school: String,
    pub classes: Vec<SchoolRecord>,
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub accessible_classes: Vec<SchoolRecord>,
    pub inaccessible_classes: Vec<SchoolRecord>,
    /// Smallest `points - threshold` among accessible classes.
    pub min_accessible_margin: Option<f64>,
    /// Smallest `threshold - points` among inaccessible classes.
    pub min_inaccessible_gap: Option<f64>,
}

impl RankedSchool {
    pub fn has_accessible(&self) -> bool {
        !self.accessible_classes.is_empty()
    }

    /// Accessible classes first, then the rest, each in data order.
    pub fn classes_for_display(&self) -> impl Iterator<Item = &SchoolRecord> {
        self.accessible_classes
            .iter()
            .chain(self.inaccessible_classes.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchoolRanking {
    pub points: f64,
    pub schools: Vec<RankedSchool>,
    /// Accessible classes across all schools, not schools.
    pub accessible_count: usize,
}

impl SchoolRanking {
    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }
}

/// How a single class looks from the applicant's point of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassOutlook {
    pub accessible: bool,
    /// Absolute distance to the threshold.
    pub difference: f64,
    pub progress_percent: f64,
}

pub fn class_outlook(record: &SchoolRecord, points: f64) -> ClassOutlook {
    let progress_percent = if record.threshold > 0.0 {
        (points / record.threshold * 100.0).min(100.0)
    } else {
        100.0
    };

    ClassOutlook {
        accessible: record.is_accessible(points),
        difference: (points - record.threshold).abs(),
        progress_percent,
    }
}

/// Groups filtered records by school in order of first appearance.
pub fn group_by_school(records: &[SchoolRecord], filter: &RankingFilter) -> Vec<SchoolGroup> {
    let mut groups: Vec<SchoolGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records.iter().filter(|record| filter.matches(record)) {
        match index.get(record.school.as_str()) {
            Some(&position) => {
                let group = &mut groups[position];
                group.min_threshold = group.min_threshold.min(record.threshold);
                group.max_threshold = group.max_threshold.max(record.threshold);
                group.classes.push(record.clone());
            }
            None => {
                index.insert(record.school.as_str(), groups.len());
                groups.push(SchoolGroup {
                    school: record.school.clone(),
                    classes: vec![record.clone()],
                    min_threshold: record.threshold,
                    max_threshold: record.threshold,
                });
            }
        }
    }

    groups
}

fn min_value(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, value| match acc {
        Some(current) if current <= value => Some(current),
        _ => Some(value),
    })
}

fn assess(group: SchoolGroup, points: f64) -> RankedSchool {
    let (accessible_classes, inaccessible_classes): (Vec<_>, Vec<_>) = group
        .classes
        .iter()
        .cloned()
        .partition(|record| record.is_accessible(points));

    let min_accessible_margin = min_value(accessible_classes.iter().map(|c| points - c.threshold));
    let min_inaccessible_gap = min_value(inaccessible_classes.iter().map(|c| c.threshold - points));

    RankedSchool {
        school: group.school,
        classes: group.classes,
        min_threshold: group.min_threshold,
        max_threshold: group.max_threshold,
        accessible_classes,
        inaccessible_classes,
        min_accessible_margin,
        min_inaccessible_gap,
    }
}

/// Schools with an accessible class come first, the tightest margin leading;
/// the remaining schools follow, closest miss first.
fn compare_schools(a: &RankedSchool, b: &RankedSchool) -> Ordering {
    match (a.has_accessible(), b.has_accessible()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => a
            .min_accessible_margin
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.min_accessible_margin.unwrap_or(f64::INFINITY)),
        (false, false) => a
            .min_inaccessible_gap
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.min_inaccessible_gap.unwrap_or(f64::INFINITY)),
    }
}

pub fn rank_schools(records: &[SchoolRecord], points: f64, filter: &RankingFilter) -> SchoolRanking {
    // NaN and negative scores count as zero
    let points = points.max(0.0);

    let mut schools: Vec<RankedSchool> = group_by_school(records, filter)
        .into_iter()
        .map(|group| assess(group, points))
        .collect();
    schools.sort_by(compare_schools);

    let accessible_count: usize = schools.iter().map(|s| s.accessible_classes.len()).sum();

    debug!(
        points,
        schools = schools.len(),
        accessible_count,
        "ranked schools"
    );

    SchoolRanking {
        points,
        schools,
        accessible_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn record(school: &str, class_name: &str, threshold: f64) -> SchoolRecord {
        SchoolRecord::new(school, class_name, threshold)
    }

    fn order(ranking: &SchoolRanking) -> Vec<&str> {
        ranking.schools.iter().map(|s| s.school.as_str()).collect()
    }

    #[test]
    fn tightest_accessible_margin_ranks_first() {
        let records = vec![
            record("G1", "A", 100.0),
            record("G1", "B", 150.0),
            record("G2", "C", 90.0),
        ];
        let ranking = rank_schools(&records, 120.0, &RankingFilter::default());

        assert_eq!(order(&ranking), vec!["G1", "G2"]);
        let g1 = &ranking.schools[0];
        assert_eq!(g1.min_accessible_margin, Some(20.0));
        assert_eq!(g1.min_inaccessible_gap, Some(30.0));
        assert_eq!(g1.min_threshold, 100.0);
        assert_eq!(g1.max_threshold, 150.0);
        let g2 = &ranking.schools[1];
        assert_eq!(g2.min_accessible_margin, Some(30.0));
        assert_eq!(g2.min_inaccessible_gap, None);
        assert_eq!(ranking.accessible_count, 2);
    }

    #[test]
    fn unreachable_schools_follow_sorted_by_gap() {
        let records = vec![
            record("Far", "A", 190.0),
            record("Near", "A", 130.0),
            record("Safe", "A", 60.0),
            record("Nearer", "A", 125.0),
        ];
        let ranking = rank_schools(&records, 120.0, &RankingFilter::default());
        assert_eq!(order(&ranking), vec!["Safe", "Nearer", "Near", "Far"]);
        assert_eq!(ranking.accessible_count, 1);
    }

    #[test]
    fn equal_keys_keep_data_order() {
        let records = vec![
            record("B", "A", 100.0),
            record("A", "A", 100.0),
            record("C", "A", 100.0),
        ];
        let ranking = rank_schools(&records, 110.0, &RankingFilter::default());
        assert_eq!(order(&ranking), vec!["B", "A", "C"]);
    }

    #[test]
    fn ranking_is_deterministic() {
        let records = vec![
            record("G1", "A (mat-fiz)", 100.0),
            record("G2", "B (biol-chem)", 140.0),
            record("G3", "C", 120.0),
            record("G1", "D", 160.0),
        ];
        let filter = RankingFilter::default();
        assert_eq!(
            rank_schools(&records, 130.0, &filter),
            rank_schools(&records, 130.0, &filter)
        );
    }

    #[test]
    fn filters_by_profile_and_school_allow_set() {
        let records = vec![
            record("I LO", "1A (mat-fiz)", 150.0),
            record("I LO", "1B (biol-chem)", 140.0),
            record("V LO", "1A (Fiz Mat)", 170.0),
            record("V LO", "1B", 120.0),
        ];

        let by_profile = RankingFilter {
            profile: Some("fiz-mat".to_string()),
            ..RankingFilter::default()
        };
        let ranking = rank_schools(&records, 160.0, &by_profile);
        assert_eq!(order(&ranking), vec!["I LO", "V LO"]);
        assert!(ranking.schools.iter().all(|s| s.classes.len() == 1));

        let by_school = RankingFilter {
            profile: None,
            schools: BTreeSet::from(["V LO".to_string()]),
        };
        let ranking = rank_schools(&records, 160.0, &by_school);
        assert_eq!(order(&ranking), vec!["V LO"]);
        assert_eq!(ranking.schools[0].classes.len(), 2);
        assert_eq!(ranking.accessible_count, 1);
    }

    #[test]
    fn unknown_profile_filters_to_empty_list() {
        let records = vec![record("I LO", "1A (mat-fiz)", 150.0)];
        let filter = RankingFilter {
            profile: Some("hum-art".to_string()),
            ..RankingFilter::default()
        };
        let ranking = rank_schools(&records, 150.0, &filter);
        assert!(ranking.is_empty());
        assert_eq!(ranking.accessible_count, 0);
    }

    #[test]
    fn zero_threshold_is_always_accessible() {
        let records = vec![record("I LO", "1A", 0.0)];
        let ranking = rank_schools(&records, 0.0, &RankingFilter::default());
        assert_eq!(ranking.accessible_count, 1);
        assert_eq!(ranking.schools[0].min_accessible_margin, Some(0.0));
        assert_eq!(class_outlook(&records[0], 0.0).progress_percent, 100.0);
    }

    #[test]
    fn display_order_puts_accessible_classes_first() {
        let records = vec![
            record("I LO", "1A", 150.0),
            record("I LO", "1B", 100.0),
            record("I LO", "1C", 110.0),
        ];
        let ranking = rank_schools(&records, 120.0, &RankingFilter::default());
        let names: Vec<&str> = ranking.schools[0]
            .classes_for_display()
            .map(|c| c.class_name.as_str())
            .collect();
        assert_eq!(names, vec!["1B", "1C", "1A"]);
    }

    #[test]
    fn outlook_reports_distance_and_progress() {
        let class = record("I LO", "1A", 160.0);
        let outlook = class_outlook(&class, 120.0);
        assert!(!outlook.accessible);
        assert_eq!(outlook.difference, 40.0);
        assert_eq!(outlook.progress_percent, 75.0);

        let outlook = class_outlook(&class, 180.0);
        assert!(outlook.accessible);
        assert_eq!(outlook.difference, 20.0);
        assert_eq!(outlook.progress_percent, 100.0);
    }

    #[test]
    fn negative_points_count_as_zero() {
        let records = vec![record("I LO", "1A", 10.0)];
        let ranking = rank_schools(&records, -5.0, &RankingFilter::default());
        assert_eq!(ranking.points, 0.0);
        assert_eq!(ranking.schools[0].min_inaccessible_gap, Some(10.0));
    }
}
