//! Duration parsing utilities.
//!
//! This module parses duration strings (e.g., "60s", "100ms", "6560ns")
//! into [`std::time::Duration`] values for command-line overrides.

use std::time::Duration;

use super::ParseError;

/// Unit suffixes and their length in nanoseconds.
///
/// Longer suffixes come first so "ms" is tried before "s" and "mins" before "m".
const UNITS: &[(&str, f64)] = &[
    ("seconds", 1e9),
    ("minutes", 60e9),
    ("second", 1e9),
    ("minute", 60e9),
    ("hours", 3600e9),
    ("hour", 3600e9),
    ("mins", 60e9),
    ("secs", 1e9),
    ("min", 60e9),
    ("sec", 1e9),
    ("hrs", 3600e9),
    ("hr", 3600e9),
    ("ms", 1e6),
    ("us", 1e3),
    ("µs", 1e3),
    ("ns", 1.0),
    ("h", 3600e9),
    ("m", 60e9),
    ("s", 1e9),
];

/// Parse a duration string into a [`Duration`]
///
/// Supports various duration formats:
/// - Raw seconds: "60", "0.5"
/// - Sub-second: "100ms", "50us", "6560ns"
/// - Seconds: "5s", "5sec", "5secs", "5second", "5seconds"
/// - Minutes: "30m", "30min", "30mins", "30minute", "30minutes"
/// - Hours: "5h", "5hr", "5hrs", "5hour", "5hours"
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use bussim::utils::duration::parse_duration;
///
/// assert_eq!(parse_duration("60"), Ok(Duration::from_secs(60)));
/// assert_eq!(parse_duration("100ms"), Ok(Duration::from_millis(100)));
/// assert_eq!(parse_duration("6560ns"), Ok(Duration::from_nanos(6560)));
/// assert!(parse_duration("invalid").is_err());
/// ```
pub fn parse_duration(duration: &str) -> Result<Duration, ParseError> {
    let duration = duration.trim();

    for (suffix, nanos_per_unit) in UNITS {
        if let Some(number) = duration.strip_suffix(suffix) {
            if let Some(value) = parse_number(number) {
                return Ok(to_duration(value, *nanos_per_unit));
            }
        }
    }

    // Only try raw seconds parsing if no unit suffix is found
    match parse_number(duration) {
        Some(seconds) => Ok(to_duration(seconds, 1e9)),
        None => Err(ParseError::Duration(duration.to_string())),
    }
}

/// Parse the numeric part, rejecting empty, negative and non-finite values
fn parse_number(number: &str) -> Option<f64> {
    let number = number.trim();
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn to_duration(value: f64, nanos_per_unit: f64) -> Duration {
    Duration::from_nanos((value * nanos_per_unit).round() as u64)
}
