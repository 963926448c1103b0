use crate::error::LoadError;
use crate::models::{locale_cmp, DataSource, ParsedDataset, Profile, SchoolRecord};
use crate::models::{extract_profile, normalize_profile};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

pub const SCHOOL_COLUMN: &str = "Szkoła";
pub const CLASS_COLUMN: &str = "Klasa";
pub const THRESHOLD_COLUMN: &str = "Próg punktowy";

pub struct ThresholdLoader {
    client: reqwest::Client,
}

impl Default for ThresholdLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn load(&self, source: &DataSource) -> Result<String, LoadError> {
        match source {
            DataSource::File(path) => self.load_file(path),
            DataSource::Url(url) => self.load_url(url).await,
        }
    }

    pub fn load_file(&self, file_path: &str) -> Result<String, LoadError> {
        let content = fs::read_to_string(file_path).map_err(|source| LoadError::Io {
            path: file_path.to_string(),
            source,
        })?;
        info!(path = file_path, bytes = content.len(), "loaded threshold table");
        Ok(content)
    }

    /// Single GET, no retry and no timeout. Any non-2xx status fails the load.
    pub async fn load_url(&self, url: &str) -> Result<String, LoadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| LoadError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let content = response.text().await.map_err(|source| LoadError::Request {
            url: url.to_string(),
            source,
        })?;
        info!(url, bytes = content.len(), "fetched threshold table");
        Ok(content)
    }

    pub async fn load_dataset(&self, source: &DataSource) -> Result<ParsedDataset, LoadError> {
        let content = self.load(source).await?;
        Ok(parse_csv(&content))
    }
}

fn threshold_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("threshold pattern is valid")
    })
}

/// Parses a threshold written with a decimal comma ("152,35"), reading the
/// leading number and ignoring trailing text. Negative and non-finite values are rejected.
pub fn parse_threshold(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replacen(',', ".", 1);
    let number = threshold_regex().find(&normalized)?;
    number
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Rows missing a school, class or usable threshold are dropped without failing the parse.
pub fn parse_csv(content: &str) -> ParsedDataset {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let columns = match reader.headers() {
        Ok(headers) => {
            let position = |name: &str| headers.iter().position(|header| header == name);
            (
                position(SCHOOL_COLUMN),
                position(CLASS_COLUMN),
                position(THRESHOLD_COLUMN),
            )
        }
        Err(e) => {
            warn!(error = %e, "unreadable header row");
            (None, None, None)
        }
    };

    let (Some(school_idx), Some(class_idx), Some(threshold_idx)) = columns else {
        warn!(
            "threshold table is missing one of the columns '{}', '{}', '{}'",
            SCHOOL_COLUMN, CLASS_COLUMN, THRESHOLD_COLUMN
        );
        return ParsedDataset::default();
    };

    let mut schools = Vec::new();
    let mut dropped = 0usize;
    // normalized -> first raw spelling
    let mut profile_labels: HashMap<String, String> = HashMap::new();

    for (line, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                debug!(line = line + 2, error = %e, "skipping unreadable row");
                dropped += 1;
                continue;
            }
        };

        let school = row.get(school_idx).unwrap_or_default();
        let class_name = row.get(class_idx).unwrap_or_default();
        let threshold = row.get(threshold_idx).and_then(parse_threshold);

        let threshold = match threshold {
            Some(threshold) if !school.is_empty() && !class_name.is_empty() => threshold,
            _ => {
                debug!(line = line + 2, "dropping incomplete row");
                dropped += 1;
                continue;
            }
        };

        let raw_profile = extract_profile(class_name);
        let profile = raw_profile.as_deref().map(normalize_profile);

        if let (Some(normalized), Some(raw)) = (&profile, raw_profile) {
            profile_labels.entry(normalized.clone()).or_insert(raw);
        }

        schools.push(SchoolRecord {
            school: school.to_string(),
            class_name: class_name.to_string(),
            threshold,
            profile,
        });
    }

    let mut profiles: Vec<Profile> = profile_labels
        .into_iter()
        .map(|(name, original)| Profile { name, original })
        .collect();
    profiles.sort_by(|a, b| locale_cmp(&a.original, &b.original).then_with(|| a.name.cmp(&b.name)));

    info!(
        classes = schools.len(),
        dropped,
        profiles = profiles.len(),
        "parsed threshold table"
    );

    ParsedDataset { schools, profiles }
}
