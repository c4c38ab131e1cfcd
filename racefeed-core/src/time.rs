//! Clock-time helpers for displaying results.

const SECONDS_PER_DAY: i64 = 86_400;

/// A parsed `H:MM:SS[.fraction]` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClockTime {
    seconds: u64,
    has_fraction: bool,
}

fn parse_two_digits(field: &str) -> Option<u64> {
    if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse::<u64>().ok().filter(|value| *value < 60)
}

fn parse_clock(raw: &str) -> Option<ClockTime> {
    let mut fields = raw.split(':');
    let hours = fields.next()?;
    let minutes = fields.next()?;
    let seconds = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    if hours.is_empty() || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours = hours.parse::<u64>().ok()?;
    let minutes = parse_two_digits(minutes)?;

    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };
    let secs = parse_two_digits(whole)?;
    let has_fraction = match fraction {
        Some(digits) if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) => {
            return None;
        }
        Some(digits) => digits.bytes().any(|b| b != b'0'),
        None => false,
    };

    let seconds = hours.checked_mul(3600)?.checked_add(minutes * 60 + secs)?;
    Some(ClockTime {
        seconds,
        has_fraction,
    })
}

fn format_hms(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Round a clock time up to the whole second and render it as `HH:MM:SS`.
///
/// Any non-zero fractional part adds a second. Hours may exceed 23 for long
/// events. Strings that are not clock times, such as `DNF`, are returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use racefeed_core::round_up_to_second;
///
/// assert_eq!(round_up_to_second("0:45:12.300"), "00:45:13");
/// assert_eq!(round_up_to_second("1:02:03.000"), "01:02:03");
/// assert_eq!(round_up_to_second("DNS"), "DNS");
/// ```
#[must_use]
pub fn round_up_to_second(raw: &str) -> String {
    let trimmed = raw.trim();
    match parse_clock(trimmed) {
        Some(clock) if clock.has_fraction => format_hms(clock.seconds.saturating_add(1)),
        Some(clock) => format_hms(clock.seconds),
        None => raw.to_owned(),
    }
}

/// Render Unix seconds as the `HH:MM:SS` time of day in UTC.
///
/// ```
/// use racefeed_core::format_time_of_day;
///
/// assert_eq!(format_time_of_day(3_661), "01:01:01");
/// assert_eq!(format_time_of_day(-1), "23:59:59");
/// ```
#[must_use]
pub fn format_time_of_day(unix_seconds: i64) -> String {
    let of_day = unix_seconds.rem_euclid(SECONDS_PER_DAY).unsigned_abs();
    format_hms(of_day)
}
