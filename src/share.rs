//! Query-string encoding of the calculator input and the ranking filter.
//!
//! The schema is flat and unversioned. Decoding never fails on a single
//! field: anything unknown, unparseable or out of range keeps its default.

use crate::models::RankingFilter;
use crate::points::{
    clamp_percent, AdditionalPoints, CalculatorInput, ExamResults, Grade, GradeSheet,
    MAX_ACHIEVEMENTS,
};
use std::collections::BTreeSet;
use tracing::debug;
use url::form_urlencoded;

const GRADE_POLISH: &str = "gp";
const GRADE_MATH: &str = "gm";
const GRADE_FOREIGN: &str = "gf";
const GRADE_ADDITIONAL: &str = "ga";
const EXAM_POLISH: &str = "ep";
const EXAM_MATH: &str = "em";
const EXAM_FOREIGN: &str = "ef";
const RED_RIBBON: &str = "rr";
const VOLUNTEER: &str = "vol";
const ACHIEVEMENTS: &str = "ach";
const PROFILE: &str = "profile";
const SCHOOL: &str = "school";
const POINTS: &str = "points";

const KNOWN_KEYS: [&str; 13] = [
    GRADE_POLISH,
    GRADE_MATH,
    GRADE_FOREIGN,
    GRADE_ADDITIONAL,
    EXAM_POLISH,
    EXAM_MATH,
    EXAM_FOREIGN,
    RED_RIBBON,
    VOLUNTEER,
    ACHIEVEMENTS,
    PROFILE,
    SCHOOL,
    POINTS,
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SharedState {
    pub input: CalculatorInput,
    pub filter: RankingFilter,
    pub points: Option<f64>,
}

impl SharedState {
    pub fn encode(&self) -> String {
        let grades = &self.input.grades;
        let exam = &self.input.exam_results;
        let extra = &self.input.additional_points;

        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair(GRADE_POLISH, grades.polish.slug())
            .append_pair(GRADE_MATH, grades.math.slug())
            .append_pair(GRADE_FOREIGN, grades.foreign_language.slug())
            .append_pair(GRADE_ADDITIONAL, grades.additional_subject.slug())
            .append_pair(EXAM_POLISH, &exam.polish.to_string())
            .append_pair(EXAM_MATH, &exam.math.to_string())
            .append_pair(EXAM_FOREIGN, &exam.foreign_language.to_string())
            .append_pair(RED_RIBBON, flag(extra.red_ribbon))
            .append_pair(VOLUNTEER, flag(extra.volunteer))
            .append_pair(ACHIEVEMENTS, &extra.achievements.to_string());

        if let Some(profile) = &self.filter.profile {
            query.append_pair(PROFILE, profile);
        }
        for school in &self.filter.schools {
            query.append_pair(SCHOOL, school);
        }
        if let Some(points) = self.points {
            query.append_pair(POINTS, &points.to_string());
        }

        query.finish()
    }

    /// `None` when the query carries none of the known keys.
    pub fn decode(query: &str) -> Option<Self> {
        let query = query.trim_start_matches('?');
        let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        if !pairs.iter().any(|(key, _)| KNOWN_KEYS.contains(&key.as_str())) {
            return None;
        }

        let value = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let defaults = CalculatorInput::default();
        let grade = |key: &str, fallback: Grade| {
            field(key, value(key), fallback, |raw| raw.parse::<Grade>().ok())
        };
        let percent = |key: &str, fallback: f64| field(key, value(key), fallback, parse_percent);
        let boolean = |key: &str| field(key, value(key), false, parse_flag);

        let input = CalculatorInput {
            grades: GradeSheet {
                polish: grade(GRADE_POLISH, defaults.grades.polish),
                math: grade(GRADE_MATH, defaults.grades.math),
                foreign_language: grade(GRADE_FOREIGN, defaults.grades.foreign_language),
                additional_subject: grade(GRADE_ADDITIONAL, defaults.grades.additional_subject),
            },
            exam_results: ExamResults {
                polish: percent(EXAM_POLISH, defaults.exam_results.polish),
                math: percent(EXAM_MATH, defaults.exam_results.math),
                foreign_language: percent(EXAM_FOREIGN, defaults.exam_results.foreign_language),
            },
            additional_points: AdditionalPoints {
                red_ribbon: boolean(RED_RIBBON),
                volunteer: boolean(VOLUNTEER),
                achievements: field(
                    ACHIEVEMENTS,
                    value(ACHIEVEMENTS),
                    defaults.additional_points.achievements,
                    parse_achievements,
                ),
            },
        };

        let profile = value(PROFILE)
            .map(str::trim)
            .filter(|profile| !profile.is_empty())
            .map(str::to_string);

        let schools: BTreeSet<String> = pairs
            .iter()
            .filter(|(key, v)| key == SCHOOL && !v.trim().is_empty())
            .map(|(_, school)| school.clone())
            .collect();

        let points = value(POINTS).and_then(|raw| {
            let parsed = raw.trim().parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0);
            if parsed.is_none() {
                debug!(key = POINTS, value = raw, "ignoring invalid shared value");
            }
            parsed
        });

        Some(Self {
            input,
            filter: RankingFilter { profile, schools },
            points,
        })
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn field<T>(key: &str, raw: Option<&str>, fallback: T, parse: impl Fn(&str) -> Option<T>) -> T {
    match raw {
        None => fallback,
        Some(raw) => parse(raw.trim()).unwrap_or_else(|| {
            debug!(key, value = raw, "ignoring invalid shared value");
            fallback
        }),
    }
}

fn parse_percent(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| clamp_percent(*value) == *value)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_achievements(raw: &str) -> Option<u32> {
    raw.parse::<u32>()
        .ok()
        .filter(|count| *count <= MAX_ACHIEVEMENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SharedState {
        SharedState {
            input: CalculatorInput {
                grades: GradeSheet {
                    polish: Grade::Celujacy,
                    math: Grade::Dobry,
                    foreign_language: Grade::Dostateczny,
                    additional_subject: Grade::Dopuszczajacy,
                },
                exam_results: ExamResults::new(87.5, 0.1 + 0.2, 100.0),
                additional_points: AdditionalPoints::new(true, false, 11),
            },
            filter: RankingFilter {
                profile: Some("fiz-inf-mat".to_string()),
                schools: BTreeSet::from([
                    "I LO im. Nowodworskiego".to_string(),
                    "V LO & Co, (Kraków)".to_string(),
                ]),
            },
            points: Some(163.43),
        }
    }

    #[test]
    fn state_survives_encoding() {
        let state = sample_state();
        assert_eq!(SharedState::decode(&state.encode()), Some(state));

        let plain = SharedState::default();
        assert_eq!(SharedState::decode(&plain.encode()), Some(plain));
    }

    #[test]
    fn every_grade_survives_encoding() {
        for grade in Grade::ALL {
            let state = SharedState {
                input: CalculatorInput {
                    grades: GradeSheet {
                        polish: grade,
                        math: grade,
                        foreign_language: grade,
                        additional_subject: grade,
                    },
                    ..CalculatorInput::default()
                },
                ..SharedState::default()
            };
            assert_eq!(SharedState::decode(&state.encode()), Some(state));
        }
    }

    #[test]
    fn encoding_is_flat_and_ordered() {
        let query = SharedState::default().encode();
        assert_eq!(
            query,
            "gp=bardzo-dobry&gm=bardzo-dobry&gf=bardzo-dobry&ga=bardzo-dobry\
             &ep=80&em=80&ef=80&rr=0&vol=0&ach=0"
        );
    }

    #[test]
    fn invalid_fields_fall_back_to_defaults() {
        let state = SharedState::decode("?gp=celujacy&gm=szostka&ep=150&em=abc&ef=55&rr=yes&vol=1&ach=25&points=-3")
            .unwrap();
        let defaults = CalculatorInput::default();

        assert_eq!(state.input.grades.polish, Grade::Celujacy);
        assert_eq!(state.input.grades.math, defaults.grades.math);
        assert_eq!(state.input.exam_results.polish, 80.0);
        assert_eq!(state.input.exam_results.math, 80.0);
        assert_eq!(state.input.exam_results.foreign_language, 55.0);
        assert!(!state.input.additional_points.red_ribbon);
        assert!(state.input.additional_points.volunteer);
        assert_eq!(state.input.additional_points.achievements, 0);
        assert_eq!(state.points, None);
    }

    #[test]
    fn unrelated_query_yields_no_state() {
        assert_eq!(SharedState::decode(""), None);
        assert_eq!(SharedState::decode("utm_source=mail&x=1"), None);
        assert_eq!(SharedState::decode("%%%&&&"), None);
    }

    #[test]
    fn missing_profile_means_no_filter() {
        let state = SharedState::decode("profile=&school=I+LO&school=").unwrap();
        assert_eq!(state.filter.profile, None);
        assert_eq!(state.filter.schools, BTreeSet::from(["I LO".to_string()]));
        assert_eq!(state.input, CalculatorInput::default());
    }

    #[test]
    fn profile_named_all_is_kept() {
        let dataset = crate::loader::parse_csv("Szkoła,Klasa,Próg punktowy\nI LO,1A (All),\"100,0\"\n");
        let key = dataset.schools[0].profile.clone();
        assert_eq!(key.as_deref(), Some("all"));

        let state = SharedState {
            filter: RankingFilter {
                profile: key,
                schools: BTreeSet::new(),
            },
            ..SharedState::default()
        };
        assert_eq!(SharedState::decode(&state.encode()), Some(state));
    }

    #[test]
    fn polish_grade_labels_are_accepted() {
        let state = SharedState::decode("gp=Celuj%C4%85cy").unwrap();
        assert_eq!(state.input.grades.polish, Grade::Celujacy);
    }
}
