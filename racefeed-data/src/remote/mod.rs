//! Access to the timing provider's results API.
//!
//! [`RemoteConfig`] turns operator credentials into the authorization header
//! and URLs every request needs. [`HttpResultsSource`] issues the requests,
//! and [`validate_event`] checks that a config points at a real event before
//! any ingestion starts.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use racefeed_data::remote::{HttpResultsSource, RemoteConfig, RemoteCredentials, validate_event};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RemoteConfig::new(RemoteCredentials {
//!     login: "timer".into(),
//!     password: "secret".into(),
//!     client_id: "abc".into(),
//!     event_id: "42".into(),
//! })?;
//! let source = HttpResultsSource::new(Arc::new(config))?;
//! let event = validate_event(&source).await?;
//! println!("{event}");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod source;
mod wire;

#[doc(hidden)]
pub mod test_support;

use std::sync::Arc;

use log::info;
use racefeed_core::EventInfo;

pub use config::{
    DEFAULT_BASE_URL, DEFAULT_COLUMNS, DEFAULT_MAX_CONCURRENT_PAGES, DEFAULT_TIMEOUT,
    MAX_CONCURRENT_PAGES, ROW_COUNT_HEADER, RemoteConfig, RemoteCredentials,
};
pub use error::{ConfigurationError, TransportError};
pub use source::{DEFAULT_USER_AGENT, HttpResultsSource, ResultsSource};

/// Check that `source` points at a reachable event.
///
/// A non-success status means the client id was rejected; a success status
/// with an unreadable body means the event id is unknown.
pub async fn validate_event(source: &dyn ResultsSource) -> Result<EventInfo, ConfigurationError> {
    let event = source.fetch_event_info().await?;
    info!("validated event {} ({})", event.event_id, event.event_name);
    Ok(event)
}

/// Build a config from raw credentials and validate it against the API.
pub async fn validate_config(
    login: &str,
    password: &str,
    client_id: &str,
    event_id: &str,
) -> Result<EventInfo, ConfigurationError> {
    let config = RemoteConfig::new(RemoteCredentials {
        login: login.to_owned(),
        password: password.to_owned(),
        client_id: client_id.to_owned(),
        event_id: event_id.to_owned(),
    })?;
    let source = HttpResultsSource::new(Arc::new(config))?;
    validate_event(&source).await
}
