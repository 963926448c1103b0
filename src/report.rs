use crate::analyzer::{class_outlook, SchoolRanking};
use crate::points::PointsBreakdown;
use anyhow::Result;
use std::fs;
use std::path::Path;

pub fn headline(ranking: &SchoolRanking) -> String {
    match ranking.accessible_count {
        0 => "Check how many points you are missing for the selected schools".to_string(),
        1 => "You have a chance in 1 class!".to_string(),
        count => format!("You have a chance in {} classes!", count),
    }
}

/// Human readable ranking; every number is rounded to two decimals here and nowhere else.
pub fn summary_text(breakdown: &PointsBreakdown, ranking: &SchoolRanking) -> String {
    let mut content = String::new();
    content.push_str("Admission Points Summary\n");
    content.push_str("========================\n\n");
    content.push_str(&format!("Grades: {:.2} / 72\n", breakdown.grades));
    content.push_str(&format!("Exam: {:.2} / 100\n", breakdown.exam));
    content.push_str(&format!("Additional: {:.2} / 28\n", breakdown.additional));
    content.push_str(&format!("Total: {:.2} / 200\n\n", breakdown.total));
    content.push_str(&format!("{}\n\n", headline(ranking)));

    if ranking.is_empty() {
        content.push_str("No schools match the selected criteria\n");
        return content;
    }

    for school in &ranking.schools {
        content.push_str(&format!(
            "{}\nThresholds: {:.2} - {:.2}\n",
            school.school, school.min_threshold, school.max_threshold
        ));

        for class in school.classes_for_display() {
            let outlook = class_outlook(class, ranking.points);
            if outlook.accessible {
                content.push_str(&format!(
                    "   ✅ {} (threshold {:.2}) margin +{:.2}\n",
                    class.class_name, class.threshold, outlook.difference
                ));
            } else {
                content.push_str(&format!(
                    "   ❌ {} (threshold {:.2}) missing {:.2} ({:.0}%)\n",
                    class.class_name, class.threshold, outlook.difference, outlook.progress_percent
                ));
            }
        }
        content.push('\n');
    }

    content
}

pub fn generate_summary_report(
    breakdown: &PointsBreakdown,
    ranking: &SchoolRanking,
    output_dir: &str,
) -> Result<()> {
    fs::write(
        Path::new(output_dir).join("summary.txt"),
        summary_text(breakdown, ranking),
    )?;
    Ok(())
}

pub fn generate_ranking_csv(ranking: &SchoolRanking, output_dir: &str) -> Result<()> {
    use csv::Writer;

    let csv_path = Path::new(output_dir).join("ranking.csv");
    let mut writer = Writer::from_path(csv_path)?;
    write_ranking(ranking, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write_ranking<W: std::io::Write>(ranking: &SchoolRanking, writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "Rank",
        "School",
        "Class",
        "Profile",
        "Threshold",
        "Points",
        "Accessible",
        "Difference",
    ])?;

    for (position, school) in ranking.schools.iter().enumerate() {
        for class in school.classes_for_display() {
            let outlook = class_outlook(class, ranking.points);
            writer.write_record([
                (position + 1).to_string(),
                school.school.clone(),
                class.class_name.clone(),
                class.profile.clone().unwrap_or_default(),
                format!("{:.2}", class.threshold),
                format!("{:.2}", ranking.points),
                (if outlook.accessible { "yes" } else { "no" }).to_string(),
                format!("{:.2}", outlook.difference),
            ])?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rank_schools;
    use crate::models::{RankingFilter, SchoolRecord};
    use crate::points::{breakdown, CalculatorInput};

    fn sample_ranking() -> SchoolRanking {
        let records = vec![
            SchoolRecord::new("I LO", "1A (mat-fiz)", 150.0),
            SchoolRecord::new("I LO", "1B", 140.0),
            SchoolRecord::new("V LO", "1A", 160.0),
        ];
        rank_schools(&records, 148.0, &RankingFilter::default())
    }

    #[test]
    fn summary_lists_schools_with_two_decimals() {
        let ranking = sample_ranking();
        let text = summary_text(&breakdown(&CalculatorInput::default()), &ranking);

        assert!(text.contains("Total: 148.00 / 200"));
        assert!(text.contains("You have a chance in 1 class!"));
        assert!(text.contains("I LO\nThresholds: 140.00 - 150.00"));
        assert!(text.contains("✅ 1B (threshold 140.00) margin +8.00"));
        assert!(text.contains("❌ 1A (mat-fiz) (threshold 150.00) missing 2.00 (99%)"));
        assert!(text.find("I LO").unwrap() < text.find("V LO").unwrap());
        assert!(text.contains("❌ 1A (threshold 160.00) missing 12.00"));
        assert!(text.ends_with(")\n\n"));
    }

    #[test]
    fn empty_ranking_is_explained() {
        let ranking = rank_schools(&[], 100.0, &RankingFilter::default());
        let text = summary_text(&breakdown(&CalculatorInput::default()), &ranking);
        assert!(text.contains("No schools match the selected criteria"));
        assert!(text.contains("Check how many points you are missing"));
    }

    #[test]
    fn ranking_csv_has_one_row_per_class() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_ranking(&sample_ranking(), &mut writer).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "1,I LO,1B,,140.00,148.00,yes,8.00");
        assert_eq!(lines[2], "1,I LO,1A (mat-fiz),fiz-mat,150.00,148.00,no,2.00");
        assert_eq!(lines[3], "2,V LO,1A,,160.00,148.00,no,12.00");
    }
}
