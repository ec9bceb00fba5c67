//! Remote CSV feeds over HTTP(S)

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::SeriesGroup;
use crate::error::{Error, Result};
use crate::io::csv::{read_table, CsvFileSource};
use crate::io::DataSource;
use crate::store::RawTable;

/// Request timeout used by [`HttpSource::new`]
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `true` for `http://` and `https://` locators
pub fn is_remote(locator: &str) -> bool {
    let lower = locator.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Downloads a series group's CSV with a blocking client.
///
/// Transport failures, non-success status codes and unreadable bodies are all
/// reported as [`Error::Fetch`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::build(timeout, true)
    }

    /// Ignores `HTTP_PROXY`/`HTTPS_PROXY`; for feeds on the local network.
    pub fn direct(timeout: Duration) -> Result<Self> {
        Self::build(timeout, false)
    }

    fn build(timeout: Duration, use_proxy: bool) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("seriesguard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout);
        if !use_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(HttpSource { client })
    }
}

impl DataSource for HttpSource {
    fn fetch(&self, group: &SeriesGroup) -> Result<RawTable> {
        let fetch_error = |reason: String| Error::Fetch {
            group: group.id.clone(),
            reason,
        };

        if !is_remote(&group.locator) {
            return Err(fetch_error(format!(
                "{} is not an http(s) URL",
                group.locator
            )));
        }

        let response = self
            .client
            .get(group.locator.trim())
            .send()
            .map_err(|e| fetch_error(format!("{}: {}", group.locator, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("{}: HTTP {}", group.locator, status)));
        }

        let body = response
            .bytes()
            .map_err(|e| fetch_error(format!("{}: {}", group.locator, e)))?;
        let table = read_table(body.as_ref())
            .map_err(|e| fetch_error(format!("{}: {}", group.locator, e)))?;

        log::debug!(
            "downloaded {} row(s) with {} column(s) from {}",
            table.rows.len(),
            table.headers.len(),
            group.locator
        );
        Ok(table)
    }
}

/// Routes `http(s)://` locators to [`HttpSource`] and everything else to
/// [`CsvFileSource`].
#[derive(Debug, Clone)]
pub struct LocatorSource {
    files: CsvFileSource,
    http: HttpSource,
}

impl LocatorSource {
    pub fn new(files: CsvFileSource, http: HttpSource) -> Self {
        LocatorSource { files, http }
    }
}

impl DataSource for LocatorSource {
    fn fetch(&self, group: &SeriesGroup) -> Result<RawTable> {
        if is_remote(&group.locator) {
            self.http.fetch(group)
        } else {
            self.files.fetch(group)
        }
    }
}
