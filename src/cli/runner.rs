//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PagerConfig;
use crate::coordinator::RequestCoordinator;
use crate::error::{Error, Result, ResultExt};
use crate::fetch::{HttpFetcher, MockFetcher};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

/// Outcome of walking a source to its end (or the page limit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    /// Pages received
    pub pages: u32,
    /// Entities held at the end
    pub entities: usize,
    /// Final total (corrected once the last page was seen)
    pub total: Option<u64>,
    /// Failed requests that were retried
    pub retried: u32,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch {
                url,
                per_page,
                max_pages,
                headers,
                retries,
            } => {
                self.fetch(url.as_deref(), *per_page, *max_pages, headers, *retries)
                    .await
            }
            Commands::Demo {
                total,
                per_page,
                delay_ms,
                inflate_total,
                fail_first,
            } => {
                self.demo(*total, *per_page, *delay_ms, *inflate_total, *fail_first)
                    .await
            }
        }
    }

    /// Load configuration from the config file, or defaults
    fn load_config(&self) -> Result<PagerConfig> {
        match &self.cli.config {
            Some(path) => PagerConfig::from_file(path).context("loading --config"),
            None => Ok(PagerConfig::default()),
        }
    }

    /// Walk an HTTP endpoint
    async fn fetch(
        &self,
        url: Option<&str>,
        per_page: Option<u32>,
        max_pages: Option<u32>,
        headers: &[String],
        retries: u32,
    ) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(url) = url {
            config.http.url = url.to_string();
        }
        if let Some(per_page) = per_page {
            config.per_page = per_page;
        }
        if max_pages.is_some() {
            config.max_pages = max_pages;
        }
        for header in headers {
            let (name, value) = parse_header(header)?;
            config.http.headers.insert(name, value);
        }
        config.validate()?;

        let fetcher = HttpFetcher::new(config.http.clone())?;
        info!("Fetching {} with {} entities per page", fetcher.url(), config.per_page);

        let coordinator = RequestCoordinator::<Value>::from_config(&config);
        let errors = coordinator.subscribe_errors();
        coordinator.start(config.per_page, config.clear_existing, fetcher);

        let started = Instant::now();
        let summary = self
            .walk(&coordinator, errors, config.max_pages, retries, false)
            .await?;
        self.output_summary(&summary, started);
        Ok(())
    }

    /// Walk the mock source
    async fn demo(
        &self,
        total: u64,
        per_page: u32,
        delay_ms: u64,
        inflate_total: u64,
        fail_first: bool,
    ) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;

        let mut mock = MockFetcher::new(total, "Entity", Duration::from_millis(delay_ms))
            .with_total_inflation(inflate_total);
        if fail_first {
            mock = mock.with_failure(|attempt| attempt == 1);
        }

        let coordinator = RequestCoordinator::from_config(&config);
        let errors = coordinator.subscribe_errors();
        self.output_state(&coordinator);
        coordinator.start(per_page, config.clear_existing, mock);
        self.output_state(&coordinator);

        let started = Instant::now();
        let summary = self
            .walk(&coordinator, errors, config.max_pages, u32::from(fail_first), true)
            .await?;
        self.output_summary(&summary, started);
        Ok(())
    }

    /// Consumer loop: wait for each page, print its entities, ask for the next.
    ///
    /// Each failed page is retried up to `retries` times before the walk gives up.
    async fn walk<T>(
        &self,
        coordinator: &RequestCoordinator<T>,
        mut errors: broadcast::Receiver<Arc<Error>>,
        max_pages: Option<u32>,
        retries: u32,
        show_state: bool,
    ) -> Result<WalkSummary>
    where
        T: Clone + Send + Sync + Serialize + 'static,
    {
        let mut summary = WalkSummary {
            pages: 0,
            entities: 0,
            total: None,
            retried: 0,
        };
        let mut page_retries = 0;

        loop {
            let state = coordinator.settled().await;
            if show_state {
                self.output_state(coordinator);
            }

            if state.errored {
                let error = next_error(&mut errors).await?;

                if page_retries >= retries {
                    coordinator.clear(false);
                    return Err(Error::Other(format!(
                        "page {} failed: {error}",
                        summary.pages + 1
                    )));
                }

                page_retries += 1;
                summary.retried += 1;
                if error.is_protocol_violation() {
                    warn!(
                        "Page {} came back mislabelled ({}), retrying",
                        summary.pages + 1,
                        error
                    );
                } else {
                    warn!("Page {} failed ({}), retrying", summary.pages + 1, error);
                }
                coordinator.get_next_page();
                if show_state {
                    self.output_state(coordinator);
                }
                continue;
            }

            summary.pages += 1;
            page_retries = 0;
            let emitted = summary.entities;
            coordinator.with_results(|results| {
                for entity in results.entities.iter().skip(emitted) {
                    self.output_message(&json!({
                        "type": "RECORD",
                        "page": results.page,
                        "record": entity,
                    }));
                }
                summary.entities = results.len();
                summary.total = results.total;
            });

            let limit_reached = max_pages.is_some_and(|max| summary.pages >= max);
            if !state.has_more_pages || limit_reached {
                break;
            }

            coordinator.get_next_page();
            if show_state {
                self.output_state(coordinator);
            }
        }

        coordinator.clear(false);
        Ok(summary)
    }

    /// Output the coordinator's current flags
    fn output_state<T>(&self, coordinator: &RequestCoordinator<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.output_message(&json!({
            "type": "STATE",
            "state": coordinator.state(),
        }));
    }

    fn output_summary(&self, summary: &WalkSummary, started: Instant) {
        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": {
                "pages": summary.pages,
                "entities": summary.entities,
                "total": summary.total,
                "retried": summary.retried,
                "elapsed_ms": started.elapsed().as_millis() as u64,
            }
        }));
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Receive the failure behind an errored state.
///
/// After a lag the buffered backlog is drained so the newest failure wins.
async fn next_error(errors: &mut broadcast::Receiver<Arc<Error>>) -> Result<Arc<Error>> {
    let mut lagged = false;
    loop {
        match errors.recv().await {
            Ok(mut error) => {
                if lagged {
                    while let Ok(newer) = errors.try_recv() {
                        error = newer;
                    }
                }
                return Ok(error);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Missed {skipped} error events");
                lagged = true;
            }
            Err(RecvError::Closed) => {
                return Err(Error::Other("error channel closed".to_string()));
            }
        }
    }
}

/// Split a `NAME:VALUE` header argument
fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::invalid_value("header", format!("expected NAME:VALUE, got '{raw}'")))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_value("header", "header name is empty"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
