//! Result records and the batches that carry them.

use std::fmt;

use crate::time::{format_time_of_day, round_up_to_second};

/// One athlete's result as published by the timing provider.
///
/// `bib` is the natural key. Times are kept as the provider formats them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AthleteRecord {
    /// Unique participant identifier.
    pub bib: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Chip (net) time.
    pub net_time: String,
    /// Gun time.
    pub gun_time: String,
}

impl AthleteRecord {
    /// Build a record from its five fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use racefeed_core::AthleteRecord;
    ///
    /// let record = AthleteRecord::new("101", "Ada", "Lovelace", "0:45:12.3", "0:45:20.0");
    /// assert_eq!(record.bib, "101");
    /// ```
    #[must_use]
    pub fn new(
        bib: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        net_time: impl Into<String>,
        gun_time: impl Into<String>,
    ) -> Self {
        Self {
            bib: bib.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            net_time: net_time.into(),
            gun_time: gun_time.into(),
        }
    }

    /// Copy of the record with both times rounded up to the whole second.
    ///
    /// Values that are not clock times are left untouched.
    ///
    /// ```
    /// use racefeed_core::AthleteRecord;
    ///
    /// let record = AthleteRecord::new("7", "A", "B", "0:45:12.300", "DNF");
    /// let shown = record.rounded();
    /// assert_eq!(shown.net_time, "00:45:13");
    /// assert_eq!(shown.gun_time, "DNF");
    /// ```
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            net_time: round_up_to_second(&self.net_time),
            gun_time: round_up_to_second(&self.gun_time),
            ..self.clone()
        }
    }

    /// Full name for display.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A decoded page of results. Transient; never persisted as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    /// One-based page index.
    pub page: u64,
    /// Page size the page was requested with.
    pub page_size: u32,
    /// Records in the order the provider returned them.
    pub records: Vec<AthleteRecord>,
}

impl ResultPage {
    /// Build a page.
    #[must_use]
    pub const fn new(page: u64, page_size: u32, records: Vec<AthleteRecord>) -> Self {
        Self {
            page,
            page_size,
            records,
        }
    }

    /// Number of records on the page.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page carried no records. The trailing page usually does not.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A bib lookup, appended each time a lookup finds a record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    /// Bib that was looked up.
    pub bib: String,
    /// Lookup time as seconds since the Unix epoch.
    pub looked_up_at: i64,
}

/// A history entry joined with the record it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryRecord {
    /// The lookup.
    pub entry: HistoryEntry,
    /// The stored record, times rounded up to the whole second.
    pub record: AthleteRecord,
}

/// Event metadata returned by the provider's event endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventInfo {
    /// Provider event identifier.
    pub event_id: String,
    /// Human-readable event name.
    pub event_name: String,
    /// Start time in Unix seconds, as the provider sends it.
    pub event_start_time: String,
}

impl EventInfo {
    /// Start time rendered as `HH:MM:SS` UTC.
    ///
    /// Returns `None` when the provider value is not an integer.
    ///
    /// ```
    /// use racefeed_core::EventInfo;
    ///
    /// let info = EventInfo {
    ///     event_id: "42".into(),
    ///     event_name: "Harbour 10k".into(),
    ///     event_start_time: "1700000000".into(),
    /// };
    /// assert_eq!(info.start_time_of_day().as_deref(), Some("22:13:20"));
    /// ```
    #[must_use]
    pub fn start_time_of_day(&self) -> Option<String> {
        self.event_start_time
            .trim()
            .parse::<i64>()
            .ok()
            .map(format_time_of_day)
    }
}

impl fmt::Display for EventInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start_time_of_day() {
            Some(start) => write!(f, "{} (starts {start} UTC)", self.event_name),
            None => f.write_str(&self.event_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rounded_keeps_identity_fields() {
        let record = AthleteRecord::new("12", "Grace", "Hopper", "1:02:03.01", "1:02:04");
        let shown = record.rounded();
        assert_eq!(shown.bib, "12");
        assert_eq!(shown.display_name(), "Grace Hopper");
        assert_eq!(shown.net_time, "01:02:04");
        assert_eq!(shown.gun_time, "01:02:04");
    }

    #[rstest]
    #[case("1700000000", Some("22:13:20"))]
    #[case(" 0 ", Some("00:00:00"))]
    #[case("soon", None)]
    fn event_start_time_renders_utc(#[case] raw: &str, #[case] expected: Option<&str>) {
        let info = EventInfo {
            event_id: "1".into(),
            event_name: "Test".into(),
            event_start_time: raw.into(),
        };
        assert_eq!(info.start_time_of_day().as_deref(), expected);
    }

    #[rstest]
    fn event_display_falls_back_to_name() {
        let info = EventInfo {
            event_id: "1".into(),
            event_name: "Night Run".into(),
            event_start_time: String::new(),
        };
        assert_eq!(info.to_string(), "Night Run");
    }

    #[rstest]
    fn empty_page_is_valid() {
        let page = ResultPage::new(3, 1000, Vec::new());
        assert!(page.is_empty());
        assert_eq!(page.len(), 0);
    }
}
