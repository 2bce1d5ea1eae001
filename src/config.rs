use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use cron::Schedule;
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

use crate::document::validate_path;
use crate::error::ConfigError;

pub const DEFAULT_CONFIG: &str = include_str!("../config.json");
pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    pub path: String,
    #[serde(rename = "xml_item_path")]
    pub item_path: String,
    #[serde(rename = "xml_title_in_item_path")]
    pub title_path: String,
}

impl FeedConfig {
    /// Route the feed is served under, always with a leading slash.
    pub fn route(&self) -> String {
        normalize_route(&self.path)
    }
}

pub fn normalize_route(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    pub language: String,
    pub cron: String,
    pub rss: Vec<FeedConfig>,
    #[serde(default = "default_translate_endpoint")]
    pub translate_endpoint: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

fn default_translate_endpoint() -> String {
    DEFAULT_TRANSLATE_ENDPOINT.into()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid port {text:?}: {e}"))),
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    pub fn schedule(&self) -> Result<Schedule, ConfigError> {
        Schedule::from_str(self.cron.trim()).map_err(|source| ConfigError::Schedule {
            expr: self.cron.clone(),
            source,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language.trim().is_empty() {
            return Err(ConfigError::Validation("language must not be empty".into()));
        }
        self.schedule()?;
        check_http_url("translate_endpoint", &self.translate_endpoint)?;

        if self.rss.is_empty() {
            return Err(ConfigError::Validation("no feeds configured in rss".into()));
        }

        let mut routes = HashSet::new();
        for feed in &self.rss {
            check_http_url("rss.url", &feed.url)?;
            if feed.path.trim().trim_start_matches('/').is_empty() {
                return Err(ConfigError::Validation(format!(
                    "feed {} must have a non-root path",
                    feed.url
                )));
            }
            if feed.path.contains(['{', '}']) {
                return Err(ConfigError::Validation(format!(
                    "feed path {:?} must not contain '{{' or '}}'",
                    feed.path
                )));
            }
            for selector in [&feed.item_path, &feed.title_path] {
                validate_path(selector).map_err(|e| {
                    ConfigError::Validation(format!("feed {}: {}", feed.url, e))
                })?;
            }
            if !routes.insert(feed.route()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate feed path {}",
                    feed.route()
                )));
            }
        }

        Ok(())
    }
}

fn check_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{field} {value:?} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "{field} {value:?} has unsupported scheme {other}"
        ))),
    }
}

/// Writes the bundled default config to `path`.
pub fn write_default(path: impl AsRef<Path>, force: bool) -> Result<(), ConfigError> {
    let path = path.as_ref();
    if path.exists() && !force {
        return Err(ConfigError::Validation(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
