use thiserror::Error;

/// Failure to obtain the threshold table. Loading aborts; no partial dataset exists.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load threshold data from file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load threshold data from {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to load threshold data from {url}: server answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid selector '{0}'")]
    Selector(String),
    #[error("failed to write threshold csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write threshold csv: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Grade text matching neither a slug nor a certificate label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown grade '{0}'")]
pub struct UnknownGrade(pub String);
