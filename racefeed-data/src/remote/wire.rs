//! JSON payloads returned by the results API.
//!
//! These types mirror the provider's field names and convert into the
//! domain types from `racefeed-core`.

use racefeed_core::{AthleteRecord, EventInfo};
use serde::Deserialize;

/// Body of a results page.
#[derive(Debug, Deserialize)]
pub(crate) struct ResultsResponse {
    /// Missing or `null` lists decode as an empty page.
    #[serde(default)]
    pub event_results: Option<Vec<WireResult>>,
}

/// One row of a results page.
#[derive(Debug, Deserialize)]
pub(crate) struct WireResult {
    pub results_bib: String,
    #[serde(default)]
    pub results_first_name: String,
    #[serde(default)]
    pub results_last_name: String,
    #[serde(default)]
    pub results_time: String,
    #[serde(default)]
    pub results_gun_time: String,
}

impl From<WireResult> for AthleteRecord {
    fn from(row: WireResult) -> Self {
        Self {
            bib: row.results_bib,
            first_name: row.results_first_name,
            last_name: row.results_last_name,
            net_time: row.results_time,
            gun_time: row.results_gun_time,
        }
    }
}

impl ResultsResponse {
    pub(crate) fn into_records(self) -> Vec<AthleteRecord> {
        self.event_results
            .unwrap_or_default()
            .into_iter()
            .map(AthleteRecord::from)
            .collect()
    }
}

/// Body of the event metadata endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct EventResponse {
    pub event: WireEvent,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireEvent {
    pub event_id: String,
    pub event_name: String,
    pub event_start_time: String,
}

impl From<EventResponse> for EventInfo {
    fn from(response: EventResponse) -> Self {
        let event = response.event;
        Self {
            event_id: event.event_id,
            event_name: event.event_name,
            event_start_time: event.event_start_time,
        }
    }
}
