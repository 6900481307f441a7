//! HTTP page source
//!
//! Fetches pages from a JSON endpoint using page-number query parameters:
//! - `?page=2&per_page=50`
//! - `?p=2&limit=50` (parameter names are configurable)

use super::types::PageFetcher;
use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::types::PagedResult;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Page source backed by a JSON HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url: Url,
    config: HttpConfig,
}

impl HttpFetcher {
    /// Create a fetcher for the endpoint in `config`
    pub fn new(config: HttpConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::invalid_value("http.url", "endpoint URL is required"));
        }
        let url = Url::parse(&config.url)?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("inflight-pager/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url,
            config,
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl PageFetcher<Value> for HttpFetcher {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<PagedResult<Value>> {
        let mut req = self.client.get(self.url.clone()).query(&[
            (self.config.page_param.as_str(), page.to_string()),
            (self.config.per_page_param.as_str(), per_page.to_string()),
        ]);

        for (key, value) in &self.config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout().as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body: Value = response.json().await?;
        debug!("Fetched page {} from {}", page, self.url);

        decode_page(&body, &self.config, page)
    }
}

/// Map a response body onto a page using the configured field paths.
///
/// A missing total is left unset; a missing page number echoes `requested`.
pub fn decode_page(body: &Value, config: &HttpConfig, requested: u32) -> Result<PagedResult<Value>> {
    let entities = match lookup(body, &config.entities_path) {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(Error::decode(format!(
                "expected an array at '{}', found {}",
                config.entities_path,
                type_name(other)
            )))
        }
        None => {
            return Err(Error::decode(format!(
                "no entities at '{}'",
                config.entities_path
            )))
        }
    };

    let total = match lookup(body, &config.total_path) {
        Some(value) => Some(as_u64(value).ok_or_else(|| {
            Error::decode(format!("total at '{}' is not a count", config.total_path))
        })?),
        None => None,
    };

    let page = match lookup(body, &config.page_path) {
        Some(value) => as_u64(value)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                Error::decode(format!("page at '{}' is not a number", config.page_path))
            })?,
        None => requested,
    };

    Ok(PagedResult {
        total,
        page: Some(page),
        entities,
    })
}

/// Follow a dotted path ("$.a.b" or "a.b"); "$" or "" selects the root
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    match current {
        Value::Null => None,
        other => Some(other),
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
