//! Admission points calculator and school ranking for secondary-school
//! recruitment.
//!
//! [`points`] turns grades, exam results and achievements into a score,
//! [`loader`] reads the per-class threshold table and [`analyzer`] orders
//! schools by how close that score is to their thresholds.

pub mod analyzer;
pub mod error;
pub mod loader;
pub mod models;
pub mod points;
pub mod report;
pub mod scraper;
pub mod share;
pub mod telemetry;

pub use analyzer::{rank_schools, RankedSchool, SchoolRanking};
pub use error::{LoadError, ScrapeError, UnknownGrade};
pub use loader::{parse_csv, ThresholdLoader};
pub use models::{ParsedDataset, Profile, RankingFilter, SchoolRecord};
pub use points::{total_points, CalculatorInput, Grade};
pub use share::SharedState;
