use crate::points::CalculatorInput;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const DEFAULT_DATA_FILE: &str = "progi_licea_krakow_2025_2026.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Data source configuration
    pub data_source_mode: DataSourceMode,
    pub data_file: Option<String>,
    pub data_url: Option<String>,
    pub output_directory: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub calculator: CalculatorInput,
    #[serde(default)]
    pub filter: RankingFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceMode {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "internet")]
    Internet,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source_mode: DataSourceMode::Local,
            data_file: Some(DEFAULT_DATA_FILE.to_string()),
            data_url: Some(format!("https://example.com/{}", DEFAULT_DATA_FILE)),
            output_directory: Some("output".to_string()),
            log_level: default_log_level(),
            calculator: CalculatorInput::default(),
            filter: RankingFilter::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    /// Where the threshold table should be read from, per the configured mode.
    pub fn data_source(&self) -> anyhow::Result<DataSource> {
        match self.data_source_mode {
            DataSourceMode::Local => Ok(DataSource::File(
                self.data_file
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
            )),
            DataSourceMode::Internet => self
                .data_url
                .clone()
                .map(DataSource::Url)
                .ok_or_else(|| anyhow::anyhow!("data_url must be set when data_source_mode = \"internet\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(String),
    Url(String),
}

impl DataSource {
    pub fn location(&self) -> &str {
        match self {
            DataSource::File(path) => path,
            DataSource::Url(url) => url,
        }
    }
}

/// Which classes take part in a ranking pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RankingFilter {
    /// Normalized profile key; `None` keeps every profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Allow-listed schools; empty keeps every school.
    #[serde(default)]
    pub schools: BTreeSet<String>,
}

impl RankingFilter {
    pub fn matches(&self, record: &SchoolRecord) -> bool {
        let profile_ok = match &self.profile {
            None => true,
            Some(wanted) => record.profile.as_deref() == Some(wanted.as_str()),
        };
        profile_ok && (self.schools.is_empty() || self.schools.contains(&record.school))
    }
}

/// One class of one school together with its admission threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub school: String,
    pub class_name: String,
    pub threshold: f64,
    pub profile: Option<String>,
}

impl SchoolRecord {
    /// Builds a record, deriving the normalized profile from the class name.
    pub fn new(school: impl Into<String>, class_name: impl Into<String>, threshold: f64) -> Self {
        let class_name = class_name.into();
        let profile = extract_profile(&class_name).map(|raw| normalize_profile(&raw));
        Self {
            school: school.into(),
            class_name,
            threshold,
            profile,
        }
    }

    pub fn is_accessible(&self, points: f64) -> bool {
        points >= self.threshold
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Normalized key.
    pub name: String,
    /// First raw spelling seen in the data.
    pub original: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDataset {
    pub schools: Vec<SchoolRecord>,
    pub profiles: Vec<Profile>,
}

fn profile_regex() -> &'static Regex {
    static PROFILE: OnceLock<Regex> = OnceLock::new();
    PROFILE.get_or_init(|| Regex::new(r"\(([^)]+)\)").expect("profile pattern is valid"))
}

fn whitespace_regex() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Text inside the first parenthesis pair of a class name, trimmed.
/// "Klasa 1A (mat-fiz-inf)" -> "mat-fiz-inf"
pub fn extract_profile(class_name: &str) -> Option<String> {
    profile_regex()
        .captures(class_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|profile| !profile.is_empty())
}

/// Case- and order-insensitive profile key: "Mat Fiz" and "fiz-mat" both become "fiz-mat".
pub fn normalize_profile(profile: &str) -> String {
    let lowered = profile.to_lowercase();
    let dashed = whitespace_regex().replace_all(&lowered, "-");

    let mut tokens: Vec<&str> = dashed.split('-').collect();
    tokens.sort_unstable();
    tokens.join("-")
}

/// Polish collation position of a lowercase letter: base letter plus its rank among variants.
fn collation_unit(c: char) -> (char, u8) {
    match c {
        'ą' => ('a', 1),
        'ć' => ('c', 1),
        'ę' => ('e', 1),
        'ł' => ('l', 1),
        'ń' => ('n', 1),
        'ó' => ('o', 1),
        'ś' => ('s', 1),
        'ź' => ('z', 1),
        'ż' => ('z', 2),
        other => (other, 0),
    }
}

/// Locale-aware string ordering for presentation labels.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| {
        s.chars()
            .flat_map(char::to_lowercase)
            .map(collation_unit)
            .collect::<Vec<_>>()
    };

    primary(a)
        .cmp(&primary(b))
        .then_with(|| {
            // lowercase sorts before uppercase
            let case = |s: &str| s.chars().map(char::is_uppercase).collect::<Vec<_>>();
            case(a).cmp(&case(b))
        })
        .then_with(|| a.cmp(b))
}
