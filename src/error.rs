use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid cron expression {expr:?}: {source}")]
    Schedule {
        expr: String,
        #[source]
        source: cron::error::Error,
    },

    #[error("Invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("Malformed XML document: {0}")]
    Structure(String),

    #[error("Feed is not UTF-8: {0}")]
    Encoding(String),

    #[error("Unsupported element path {0:?}")]
    Path(String),

    #[error("Failed to serialize XML document: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} when fetching {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Failed to parse feed: {0}")]
    Parse(#[from] XmlError),
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Translation provider returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Translation response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Translation response has no sentences")]
    Shape,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Xml(#[from] XmlError),
}
