//! Data rate values and parsing.
//!
//! Rates are written the way link and application rates usually are in
//! simulation setups ("8kbps", "50Mb/s", "100Mbps") and stored as bits per
//! second. Multipliers are decimal (k = 10^3, M = 10^6, G = 10^9).

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ParseError;

/// Match: "<number><optional whitespace><k|M|G><bps|b/s|Bps|B/s>"
static RATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?)\s*([kKmMgG]?)(bps|b/s|Bps|B/s)$").expect("Invalid rate regex")
});

/// A data rate in bits per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataRate(u64);

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        Self(bps)
    }

    pub const fn from_kbps(kbps: u64) -> Self {
        Self(kbps * 1_000)
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        Self(mbps * 1_000_000)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Time needed to put `bytes` on a link running at this rate
    ///
    /// A zero rate never finishes; callers validate rates before asking.
    pub fn transmission_time(self, bytes: u64) -> Duration {
        if self.0 == 0 {
            return Duration::MAX;
        }
        let nanos = (bytes as u128 * 8 * 1_000_000_000).div_ceil(self.0 as u128);
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

/// Parse a data rate string such as "8kbps", "50Mb/s" or "12.5MBps"
///
/// A bare number is taken as bits per second.
///
/// # Examples
/// ```
/// use bussim::utils::rate::{parse_data_rate, DataRate};
///
/// assert_eq!(parse_data_rate("8kbps"), Ok(DataRate::from_kbps(8)));
/// assert_eq!(parse_data_rate("50Mb/s"), Ok(DataRate::from_mbps(50)));
/// assert!(parse_data_rate("fast").is_err());
/// ```
pub fn parse_data_rate(rate: &str) -> Result<DataRate, ParseError> {
    let rate = rate.trim();

    if let Ok(bps) = rate.parse::<u64>() {
        return Ok(DataRate(bps));
    }

    let caps = RATE_PATTERN
        .captures(rate)
        .ok_or_else(|| ParseError::Rate(rate.to_string()))?;

    let value: f64 = caps[1]
        .parse()
        .map_err(|_| ParseError::Rate(rate.to_string()))?;

    let multiplier = match &caps[2] {
        "k" | "K" => 1e3,
        "m" | "M" => 1e6,
        "g" | "G" => 1e9,
        _ => 1.0,
    };

    let unit_bits = if caps[3].starts_with('B') { 8.0 } else { 1.0 };

    Ok(DataRate((value * multiplier * unit_bits).round() as u64))
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps >= 1_000_000_000 && bps % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", bps / 1_000_000_000)
        } else if bps >= 1_000_000 && bps % 1_000_000 == 0 {
            write!(f, "{}Mbps", bps / 1_000_000)
        } else if bps >= 1_000 && bps % 1_000 == 0 {
            write!(f, "{}kbps", bps / 1_000)
        } else {
            write!(f, "{}bps", bps)
        }
    }
}

impl std::str::FromStr for DataRate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_data_rate(s)
    }
}

impl Serialize for DataRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_data_rate(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bit_rates() {
        assert_eq!(parse_data_rate("8000"), Ok(DataRate::from_bps(8000)));
        assert_eq!(parse_data_rate("8kbps"), Ok(DataRate::from_kbps(8)));
        assert_eq!(parse_data_rate("8kb/s"), Ok(DataRate::from_kbps(8)));
        assert_eq!(parse_data_rate("50Mb/s"), Ok(DataRate::from_mbps(50)));
        assert_eq!(parse_data_rate("100Mbps"), Ok(DataRate::from_mbps(100)));
        assert_eq!(parse_data_rate("1Gbps"), Ok(DataRate::from_mbps(1000)));
        assert_eq!(parse_data_rate("2.5Mbps"), Ok(DataRate::from_kbps(2500)));
    }

    #[test]
    fn test_parse_byte_rates() {
        assert_eq!(parse_data_rate("1kBps"), Ok(DataRate::from_kbps(8)));
        assert_eq!(parse_data_rate("1MB/s"), Ok(DataRate::from_mbps(8)));
    }

    #[test]
    fn test_parse_invalid_rates() {
        assert!(parse_data_rate("").is_err());
        assert!(parse_data_rate("fast").is_err());
        assert!(parse_data_rate("10Xbps").is_err());
        assert!(parse_data_rate("-5Mbps").is_err());
    }

    #[test]
    fn test_display_round_trips_common_rates() {
        assert_eq!(DataRate::from_mbps(100).to_string(), "100Mbps");
        assert_eq!(DataRate::from_kbps(8).to_string(), "8kbps");
        assert_eq!(DataRate::from_bps(1500).to_string(), "1500bps");
    }

    #[test]
    fn test_transmission_time() {
        // 1446 bytes on 100Mbps: 11568 bits -> 115.68us
        let t = DataRate::from_mbps(100).transmission_time(1446);
        assert_eq!(t, Duration::from_nanos(115_680));
        // 64 bytes at 8kbps -> 64ms
        assert_eq!(
            DataRate::from_kbps(8).transmission_time(64),
            Duration::from_millis(64)
        );
    }
}
