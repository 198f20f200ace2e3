use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::*;

/// Offset between Julian Date and Modified Julian Date (`MJD = JD - 2400000.5`).
pub const MJD_OFFSET: f64 = 2_400_000.5;

/// Modified Julian Date representation.
/// MJD 0 = 1858-11-17 00:00:00 UTC
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ModifiedJulianDate(qtty::Days);

impl ModifiedJulianDate {
    /// Create a new MJD value.
    pub fn new<V: Into<qtty::Days>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw MJD value as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// Create from a Julian Date.
    pub fn from_julian_date(jd: f64) -> Self {
        Self::new(jd - MJD_OFFSET)
    }

    /// Equivalent Julian Date.
    pub fn to_julian_date(&self) -> f64 {
        self.value() + MJD_OFFSET
    }

    /// Create from Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    pub fn from_unix_timestamp(timestamp: f64) -> Self {
        Self::new(timestamp / 86400.0 + 40587.0)
    }

    /// Create from chrono DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_unix_timestamp(dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9)
    }

    /// Parse a human-readable UTC date string.
    ///
    /// Accepted forms: `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.f]`,
    /// `YYYY-MM-DD HH:MM:SS[.f]` and RFC 3339 with an explicit offset.
    ///
    /// # Errors
    /// Returns a message naming the input when none of the forms match.
    pub fn parse_date(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self::from_datetime(midnight.and_utc()));
            }
        }

        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(Self::from_datetime(naive.and_utc()));
            }
        }

        DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|_| format!("Unrecognized date '{}': expected YYYY-MM-DD", input))
    }
}

impl From<f64> for ModifiedJulianDate {
    fn from(v: f64) -> Self {
        ModifiedJulianDate::new(v)
    }
}

impl std::str::FromStr for ModifiedJulianDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_date(s)
    }
}
