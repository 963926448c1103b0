//! Admission points calculator.
//!
//! Total points are the sum of three independently capped parts:
//! grades (max 72), eighth-grade exam (max 100) and additional
//! achievements (max 28), 200 points overall.

use crate::error::UnknownGrade;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_GRADE_POINTS: f64 = 72.0;
pub const MAX_EXAM_POINTS: f64 = 100.0;
pub const MAX_ADDITIONAL_POINTS: f64 = 28.0;
pub const MAX_TOTAL_POINTS: f64 = MAX_GRADE_POINTS + MAX_EXAM_POINTS + MAX_ADDITIONAL_POINTS;

pub const POLISH_WEIGHT: f64 = 0.35;
pub const MATH_WEIGHT: f64 = 0.35;
pub const FOREIGN_LANGUAGE_WEIGHT: f64 = 0.30;

pub const RED_RIBBON_POINTS: f64 = 7.0;
pub const VOLUNTEER_POINTS: f64 = 3.0;
pub const MAX_ACHIEVEMENTS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "Celujący")]
    Celujacy,
    #[serde(rename = "Bardzo dobry")]
    BardzoDobry,
    #[serde(rename = "Dobry")]
    Dobry,
    #[serde(rename = "Dostateczny")]
    Dostateczny,
    #[serde(rename = "Dopuszczający")]
    Dopuszczajacy,
}

impl Grade {
    pub const ALL: [Grade; 5] = [
        Grade::Celujacy,
        Grade::BardzoDobry,
        Grade::Dobry,
        Grade::Dostateczny,
        Grade::Dopuszczajacy,
    ];

    pub fn points(self) -> u32 {
        match self {
            Grade::Celujacy => 18,
            Grade::BardzoDobry => 17,
            Grade::Dobry => 14,
            Grade::Dostateczny => 8,
            Grade::Dopuszczajacy => 2,
        }
    }

    /// Label as printed on the school certificate.
    pub fn label(self) -> &'static str {
        match self {
            Grade::Celujacy => "Celujący",
            Grade::BardzoDobry => "Bardzo dobry",
            Grade::Dobry => "Dobry",
            Grade::Dostateczny => "Dostateczny",
            Grade::Dopuszczajacy => "Dopuszczający",
        }
    }

    /// ASCII identifier used in query strings.
    pub fn slug(self) -> &'static str {
        match self {
            Grade::Celujacy => "celujacy",
            Grade::BardzoDobry => "bardzo-dobry",
            Grade::Dobry => "dobry",
            Grade::Dostateczny => "dostateczny",
            Grade::Dopuszczajacy => "dopuszczajacy",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Grade {
    type Err = UnknownGrade;

    /// Accepts both the slug and the certificate label, case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase();
        Grade::ALL
            .into_iter()
            .find(|grade| grade.slug() == wanted || grade.label().to_lowercase() == wanted)
            .ok_or_else(|| UnknownGrade(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeSheet {
    pub polish: Grade,
    pub math: Grade,
    pub foreign_language: Grade,
    pub additional_subject: Grade,
}

impl Default for GradeSheet {
    fn default() -> Self {
        Self {
            polish: Grade::BardzoDobry,
            math: Grade::BardzoDobry,
            foreign_language: Grade::BardzoDobry,
            additional_subject: Grade::BardzoDobry,
        }
    }
}

/// Exam results in percent, 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamResults {
    pub polish: f64,
    pub math: f64,
    pub foreign_language: f64,
}

impl ExamResults {
    pub fn new(polish: f64, math: f64, foreign_language: f64) -> Self {
        Self {
            polish: clamp_percent(polish),
            math: clamp_percent(math),
            foreign_language: clamp_percent(foreign_language),
        }
    }
}

impl Default for ExamResults {
    fn default() -> Self {
        Self::new(80.0, 80.0, 80.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalPoints {
    /// Certificate with distinction.
    pub red_ribbon: bool,
    pub volunteer: bool,
    /// Contest and other achievement points.
    pub achievements: u32,
}

impl AdditionalPoints {
    pub fn new(red_ribbon: bool, volunteer: bool, achievements: u32) -> Self {
        Self {
            red_ribbon,
            volunteer,
            achievements: achievements.min(MAX_ACHIEVEMENTS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorInput {
    pub grades: GradeSheet,
    pub exam_results: ExamResults,
    pub additional_points: AdditionalPoints,
}

impl CalculatorInput {
    /// Same input with every numeric field pulled into its declared range.
    pub fn clamped(&self) -> Self {
        let exam = self.exam_results;
        let extra = self.additional_points;
        Self {
            grades: self.grades,
            exam_results: ExamResults::new(exam.polish, exam.math, exam.foreign_language),
            additional_points: AdditionalPoints::new(
                extra.red_ribbon,
                extra.volunteer,
                extra.achievements,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsBreakdown {
    pub grades: f64,
    pub exam: f64,
    pub additional: f64,
    pub total: f64,
}

pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

pub fn grade_points(grades: &GradeSheet) -> f64 {
    let sum = grades.polish.points()
        + grades.math.points()
        + grades.foreign_language.points()
        + grades.additional_subject.points();

    f64::from(sum).min(MAX_GRADE_POINTS)
}

pub fn exam_points(exam: &ExamResults) -> f64 {
    let polish = clamp_percent(exam.polish) * POLISH_WEIGHT;
    let math = clamp_percent(exam.math) * MATH_WEIGHT;
    let foreign_language = clamp_percent(exam.foreign_language) * FOREIGN_LANGUAGE_WEIGHT;

    (polish + math + foreign_language).min(MAX_EXAM_POINTS)
}

pub fn additional_points(additional: &AdditionalPoints) -> f64 {
    let mut points = 0.0;
    if additional.red_ribbon {
        points += RED_RIBBON_POINTS;
    }
    if additional.volunteer {
        points += VOLUNTEER_POINTS;
    }
    points += f64::from(additional.achievements.min(MAX_ACHIEVEMENTS));

    points.min(MAX_ADDITIONAL_POINTS)
}

pub fn total_points(input: &CalculatorInput) -> f64 {
    breakdown(input).total
}

pub fn breakdown(input: &CalculatorInput) -> PointsBreakdown {
    let grades = grade_points(&input.grades);
    let exam = exam_points(&input.exam_results);
    let additional = additional_points(&input.additional_points);

    PointsBreakdown {
        grades,
        exam,
        additional,
        total: grades + exam + additional,
    }
}
