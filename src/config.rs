//! Configuration types for the pager
//!
//! Settings can be loaded from YAML or JSON files. Every field has a default
//! so a config file only needs to name what it changes.

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagerConfig {
    /// Entities requested per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Blank visible results as soon as the source is switched
    #[serde(default = "default_true")]
    pub clear_existing: bool,

    /// Stop walking after this many pages
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Buffered error events per subscriber before the oldest are dropped
    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,

    /// HTTP page source settings
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_per_page() -> u32 {
    25
}

fn default_true() -> bool {
    true
}

fn default_error_capacity() -> usize {
    crate::coordinator::DEFAULT_ERROR_CAPACITY
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            clear_existing: true,
            max_pages: None,
            error_capacity: default_error_capacity(),
            http: HttpConfig::default(),
        }
    }
}

impl PagerConfig {
    /// Load config from a YAML or JSON file (JSON is a subset of YAML)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Parse config from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Parse config from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Check values the pager cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(Error::invalid_value("per_page", "must be at least 1"));
        }
        if self.error_capacity == 0 {
            return Err(Error::invalid_value("error_capacity", "must be at least 1"));
        }
        if self.max_pages == Some(0) {
            return Err(Error::invalid_value("max_pages", "must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// HTTP Source Config
// ============================================================================

/// Settings for [`HttpFetcher`](crate::fetch::HttpFetcher)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Endpoint URL; page parameters are appended to its query
    #[serde(default)]
    pub url: String,

    /// Query parameter carrying the page number
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Query parameter carrying the page size
    #[serde(default = "default_per_page_param")]
    pub per_page_param: String,

    /// Dotted path to the declared total (e.g. "meta.total")
    #[serde(default = "default_total_path")]
    pub total_path: String,

    /// Dotted path to the page number echoed by the server
    #[serde(default = "default_page_path")]
    pub page_path: String,

    /// Dotted path to the entity array ("$" for a bare array body)
    #[serde(default = "default_entities_path")]
    pub entities_path: String,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_per_page_param() -> String {
    "per_page".to_string()
}

fn default_total_path() -> String {
    "total".to_string()
}

fn default_page_path() -> String {
    "page".to_string()
}

fn default_entities_path() -> String {
    "entities".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            page_param: default_page_param(),
            per_page_param: default_per_page_param(),
            total_path: default_total_path(),
            page_path: default_page_path(),
            entities_path: default_entities_path(),
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    /// Create HTTP config for the given endpoint with default field paths
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = PagerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, PagerConfig::default());
        assert_eq!(config.per_page, 25);
        assert!(config.clear_existing);
        assert_eq!(config.http.page_param, "page");
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
per_page: 5
clear_existing: false
max_pages: 3
http:
  url: "https://api.example.com/items"
  per_page_param: limit
  total_path: meta.total
  entities_path: data
  headers:
    Authorization: Bearer abc
"#;
        let config = PagerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.per_page, 5);
        assert!(!config.clear_existing);
        assert_eq!(config.max_pages, Some(3));
        assert_eq!(config.http.url, "https://api.example.com/items");
        assert_eq!(config.http.per_page_param, "limit");
        assert_eq!(config.http.page_param, "page");
        assert_eq!(config.http.total_path, "meta.total");
        assert_eq!(
            config.http.headers.get("Authorization"),
            Some(&"Bearer abc".to_string())
        );
    }

    #[test]
    fn test_parse_json() {
        let config = PagerConfig::from_json_str(r#"{"per_page": 10, "error_capacity": 4}"#).unwrap();
        assert_eq!(config.per_page, 10);
        assert_eq!(config.error_capacity, 4);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "per_page: 7").unwrap();

        let config = PagerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.per_page, 7);
    }

    #[test]
    fn test_from_missing_file() {
        let err = PagerConfig::from_file("/nonexistent/pager.yaml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_from_unreadable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = PagerConfig::from_file(dir.path()).unwrap_err();
        assert!(err
            .to_string()
            .starts_with(&format!("reading {}: IO error:", dir.path().display())));
    }

    #[test]
    fn test_validate() {
        assert!(PagerConfig::default().validate().is_ok());

        let config = PagerConfig {
            per_page: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { ref field, .. }) if field == "per_page"
        ));

        let config = PagerConfig {
            error_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PagerConfig {
            max_pages: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
