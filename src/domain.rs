use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SolarError;

/// A UTC calendar day, rendered as zero-padded `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, SolarError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| SolarError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    pub fn today_utc() -> Self {
        Self(chrono::Utc::now().date_naive())
    }

    /// Shifts the date by a signed number of days. Saturates at the calendar bounds.
    pub fn offset(&self, days: i64) -> Self {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        Self(shifted.unwrap_or(self.0))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// ISO-8601 timestamp of this day at the given UTC time, e.g. `2025-12-22T12:00:00Z`.
    pub fn iso_at(&self, time: NaiveTime) -> String {
        self.0.and_time(time).format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl FromStr for CalendarDate {
    type Err = SolarError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.len() != 8 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(SolarError::InvalidDate(value.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .map(Self)
            .map_err(|_| SolarError::InvalidDate(value.to_string()))
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Observed,
    Forecast,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Observed => write!(f, "observed"),
            FrameKind::Forecast => write!(f, "forecast"),
        }
    }
}

/// One slot of the window. `date` is the calendar day at `offset` from the anchor;
/// forecast slots display imagery from their proxy date instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    pub date: CalendarDate,
    pub offset: i64,
    pub kind: FrameKind,
}

/// A concrete remote resource for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub key: String,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_calendar_date_valid() {
        let date: CalendarDate = "20251222".parse().unwrap();
        assert_eq!(date.to_string(), "20251222");
        assert_eq!((date.year(), date.month(), date.day()), (2025, 12, 22));
    }

    #[test]
    fn parse_calendar_date_invalid() {
        assert_matches!(
            "2025-12-22".parse::<CalendarDate>(),
            Err(SolarError::InvalidDate(_))
        );
        assert_matches!(
            "20251332".parse::<CalendarDate>(),
            Err(SolarError::InvalidDate(_))
        );
    }

    #[test]
    fn offset_crosses_month_and_year() {
        let date: CalendarDate = "20250103".parse().unwrap();
        assert_eq!(date.offset(-5).to_string(), "20241229");
        assert_eq!(date.offset(29).to_string(), "20250201");
    }

    #[test]
    fn iso_at_noon() {
        let date: CalendarDate = "20250301".parse().unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(date.iso_at(noon), "2025-03-01T12:00:00Z");
    }

    #[test]
    fn lexical_order_matches_chronological() {
        let a: CalendarDate = "20241231".parse().unwrap();
        let b: CalendarDate = "20250101".parse().unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }
}
