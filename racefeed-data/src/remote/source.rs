//! Paginated results source and its reqwest implementation.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use racefeed_core::{AthleteRecord, EventInfo, PageSize, ResultPage};
use reqwest::{Client, Response, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use url::Url;

use super::{
    ConfigurationError, ROW_COUNT_HEADER, RemoteConfig, TransportError,
    wire::{EventResponse, ResultsResponse},
};

/// Default user agent for results API requests.
pub const DEFAULT_USER_AGENT: &str = concat!("racefeed/", env!("CARGO_PKG_VERSION"));

/// A paginated source of athlete results.
///
/// Every call is a single attempt; callers decide what a failure means.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    /// Rows requested per page.
    fn page_size(&self) -> PageSize;

    /// Total rows the source currently holds.
    async fn probe_row_count(&self) -> Result<u64, TransportError>;

    /// Fetch page `page` (one-based). An empty page is a valid result.
    async fn fetch_page(&self, page: u64) -> Result<ResultPage, TransportError>;

    /// Fetch the metadata of the configured event.
    async fn fetch_event_info(&self) -> Result<EventInfo, TransportError>;
}

/// [`ResultsSource`] backed by the provider's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpResultsSource {
    client: Client,
    config: Arc<RemoteConfig>,
}

impl HttpResultsSource {
    /// Build a source for `config`.
    ///
    /// The client enforces the config's timeout on every request.
    pub fn new(config: Arc<RemoteConfig>) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|source| ConfigurationError::HttpClient { source })?;
        Ok(Self { client, config })
    }

    /// Config the source was built from.
    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn get(&self, url: &Url) -> Result<Response, TransportError> {
        debug!("GET {}", redact(url));
        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, self.config.authorization())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                url: redact(url),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, TransportError> {
        let response = self.get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        serde_json::from_slice(&body).map_err(|err| TransportError::Decode {
            url: redact(url),
            message: err.to_string(),
        })
    }

    /// Convert a reqwest error to a `TransportError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                url: redact(url),
                timeout: self.config.timeout(),
            };
        }

        if let Some(status) = error.status() {
            return TransportError::Http {
                url: redact(url),
                status: status.as_u16(),
            };
        }

        TransportError::Network {
            url: redact(url),
            message: error.to_string(),
        }
    }
}

/// Render a URL for logs and errors without its query string, which carries
/// the client identifier.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

fn parse_row_count(response: &Response, url: &Url) -> Result<u64, TransportError> {
    let value = response
        .headers()
        .get(ROW_COUNT_HEADER)
        .ok_or_else(|| TransportError::MissingHeader {
            url: redact(url),
            header: ROW_COUNT_HEADER,
        })?;
    let invalid = || TransportError::InvalidHeader {
        url: redact(url),
        header: ROW_COUNT_HEADER,
        value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
    };
    value
        .to_str()
        .map_err(|_| invalid())?
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid())
}

#[async_trait]
impl ResultsSource for HttpResultsSource {
    fn page_size(&self) -> PageSize {
        self.config.page_size()
    }

    async fn probe_row_count(&self) -> Result<u64, TransportError> {
        let url = self.config.results_url_with_size(1, 1);
        let response = self.get(&url).await?;
        parse_row_count(&response, &url)
    }

    async fn fetch_page(&self, page: u64) -> Result<ResultPage, TransportError> {
        let url = self.config.results_url(page);
        let body: ResultsResponse = self.get_json(&url).await?;
        let records: Vec<AthleteRecord> = body.into_records();
        Ok(ResultPage::new(page, self.config.page_size().get(), records))
    }

    async fn fetch_event_info(&self) -> Result<EventInfo, TransportError> {
        let url = self.config.event_info_url();
        let body: EventResponse = self.get_json(&url).await?;
        Ok(body.into())
    }
}
