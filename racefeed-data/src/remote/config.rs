//! Immutable connection settings for the results API.

use std::{fmt, num::NonZeroUsize, time::Duration};

use base64::{Engine as _, engine::general_purpose};
use racefeed_core::PageSize;
use tokio::sync::Semaphore;
use url::Url;

use super::ConfigurationError;

/// Results API used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.chronotrack.com/api/event.json";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Concurrent page tasks used when no limit is configured.
pub const DEFAULT_MAX_CONCURRENT_PAGES: NonZeroUsize = match NonZeroUsize::new(8) {
    Some(limit) => limit,
    None => panic!("default concurrency must be non-zero"),
};

/// Largest accepted concurrency limit, bounded by the permits a
/// [`Semaphore`] can hold.
pub const MAX_CONCURRENT_PAGES: usize = Semaphore::MAX_PERMITS;

/// Response header carrying the total row count.
pub const ROW_COUNT_HEADER: &str = "x-ctlive-row-count";

/// Columns requested from the results endpoint.
pub const DEFAULT_COLUMNS: [&str; 5] = [
    "results_bib",
    "results_first_name",
    "results_last_name",
    "results_time",
    "results_gun_time",
];

/// Credentials and identifiers supplied by the operator.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RemoteCredentials {
    /// API login.
    pub login: String,
    /// API password.
    pub password: String,
    /// Provider client identifier.
    pub client_id: String,
    /// Provider event identifier.
    pub event_id: String,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("event_id", &self.event_id)
            .finish()
    }
}

/// Snapshot of everything needed to talk to the results API.
///
/// A config is never mutated once handed to an ingestion run; builders
/// consume and return a new value, and runs share it behind an `Arc`.
///
/// # Examples
///
/// ```
/// use racefeed_data::remote::{RemoteConfig, RemoteCredentials};
///
/// let config = RemoteConfig::new(RemoteCredentials {
///     login: "timer".into(),
///     password: "secret".into(),
///     client_id: "abc".into(),
///     event_id: "42".into(),
/// })
/// .expect("valid credentials");
///
/// let url = config.results_url(2);
/// assert_eq!(url.path(), "/api/event.json/42/results");
/// assert!(url.query().is_some_and(|query| query.contains("page=2")));
/// ```
#[derive(Clone)]
pub struct RemoteConfig {
    base_url: Url,
    authorization: String,
    client_id: String,
    event_id: String,
    page_size: PageSize,
    columns: Vec<String>,
    timeout: Duration,
    max_concurrent_pages: NonZeroUsize,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url.as_str())
            .field("authorization", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("event_id", &self.event_id)
            .field("page_size", &self.page_size)
            .field("columns", &self.columns)
            .field("timeout", &self.timeout)
            .field("max_concurrent_pages", &self.max_concurrent_pages)
            .finish()
    }
}

fn require(field: &'static str, value: &str) -> Result<String, ConfigurationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigurationError::MissingField { field });
    }
    Ok(trimmed.to_owned())
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason,
    };
    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot carry path segments".to_owned()));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}

impl RemoteConfig {
    /// Build a config with default base URL, page size, timeout and
    /// concurrency.
    ///
    /// Blank credentials or identifiers are rejected.
    pub fn new(credentials: RemoteCredentials) -> Result<Self, ConfigurationError> {
        let login = require("login", &credentials.login)?;
        // Passwords may legitimately carry surrounding whitespace.
        if credentials.password.is_empty() {
            return Err(ConfigurationError::MissingField { field: "password" });
        }
        let client_id = require("client_id", &credentials.client_id)?;
        let event_id = require("event_id", &credentials.event_id)?;

        let token = general_purpose::STANDARD.encode(format!("{login}:{}", credentials.password));
        Ok(Self {
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            authorization: format!("Basic {token}"),
            client_id,
            event_id,
            page_size: PageSize::default(),
            columns: DEFAULT_COLUMNS.iter().map(|&column| column.to_owned()).collect(),
            timeout: DEFAULT_TIMEOUT,
            max_concurrent_pages: DEFAULT_MAX_CONCURRENT_PAGES,
        })
    }

    /// Point the config at a different results API.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigurationError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    /// Set the number of rows requested per page.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many page tasks may run at once.
    ///
    /// Zero is rejected, as is anything above [`MAX_CONCURRENT_PAGES`].
    pub fn with_max_concurrent_pages(mut self, limit: usize) -> Result<Self, ConfigurationError> {
        if limit > MAX_CONCURRENT_PAGES {
            return Err(ConfigurationError::ExcessiveConcurrency {
                limit,
                max: MAX_CONCURRENT_PAGES,
            });
        }
        self.max_concurrent_pages =
            NonZeroUsize::new(limit).ok_or(ConfigurationError::ZeroConcurrency)?;
        Ok(self)
    }

    /// Replace the requested column list.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Base URL of the results API.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// Provider client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Provider event identifier.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Rows requested per page.
    #[must_use]
    pub const fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Concurrent page task limit.
    #[must_use]
    pub const fn max_concurrent_pages(&self) -> NonZeroUsize {
        self.max_concurrent_pages
    }

    /// Requested columns.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn event_url(&self, trailing: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // `parse_base_url` rejects cannot-be-a-base URLs, so segments exist.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.event_id);
            if let Some(segment) = trailing {
                segments.push(segment);
            }
        }
        url.set_query(None);
        url
    }

    /// URL of results page `page` at the configured page size.
    #[must_use]
    pub fn results_url(&self, page: u64) -> Url {
        self.results_url_with_size(page, self.page_size.get())
    }

    /// URL of results page `page` requesting `size` rows.
    ///
    /// The row-count probe uses `size = 1, page = 1`.
    #[must_use]
    pub fn results_url_with_size(&self, page: u64, size: u32) -> Url {
        let mut url = self.event_url(Some("results"));
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("size", &size.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("columns", &self.columns.join(","));
        url
    }

    /// URL of the event metadata endpoint.
    #[must_use]
    pub fn event_info_url(&self) -> Url {
        let mut url = self.event_url(None);
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id);
        url
    }
}
