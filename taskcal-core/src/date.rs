//! Day-bucket keys and week identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Serialize, Serializer};

/// Calendar date used as a day-bucket key.
///
/// The wire format is the legacy unpadded `YYYY-M-D` (e.g. `2024-3-4`), kept
/// for compatibility with previously stored documents. In memory this wraps a
/// real date, so ordering and week arithmetic work across month boundaries
/// even though the string form doesn't sort.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        DateKey(date)
    }

    pub fn today() -> Self {
        DateKey(Utc::now().date_naive())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        DateKey(dt.date_naive())
    }

    /// Parse a day key. Accepts both the unpadded legacy form (`2024-3-4`)
    /// and the zero-padded ISO form (`2024-03-04`).
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok().map(DateKey)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    /// The week identifier for this date: the Monday on or before it.
    pub fn week_start(&self) -> DateKey {
        let back = self.0.weekday().num_days_from_monday() as i64;
        DateKey(self.0 - Duration::days(back))
    }

    pub fn same_week(&self, other: &DateKey) -> bool {
        self.week_start() == other.week_start()
    }

    pub fn add_days(&self, days: i64) -> DateKey {
        DateKey(self.0 + Duration::days(days))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}-{}", self.0.year(), self.0.month(), self.0.day())
    }
}

impl fmt::Debug for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl FromStr for DateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateKey::parse(s).ok_or_else(|| format!("Invalid date '{s}'. Expected YYYY-M-D"))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unpadded_and_padded_keys() {
        let a = DateKey::parse("2024-3-4").expect("unpadded should parse");
        let b = DateKey::parse("2024-03-04").expect("padded should parse");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "2024-3-4", "wire form stays unpadded");
    }

    #[test]
    fn rejects_garbage() {
        assert!(DateKey::parse("lastSyncedAt").is_none());
        assert!(DateKey::parse("2024-13-40").is_none());
        assert!(DateKey::parse("").is_none());
    }

    #[test]
    fn week_start_is_monday_on_or_before() {
        // 2024-03-03 is a Sunday; its week starts Monday 2024-02-26.
        let sunday = DateKey::parse("2024-3-3").unwrap();
        assert_eq!(sunday.week_start().to_string(), "2024-2-26");

        // 2024-03-04 is a Monday; it starts its own week.
        let monday = DateKey::parse("2024-3-4").unwrap();
        assert_eq!(monday.week_start(), monday);

        assert!(!sunday.same_week(&monday));
    }

    #[test]
    fn ordering_is_date_ordering_not_string_ordering() {
        // "2024-10-1" < "2024-9-1" lexicographically, but not as dates.
        let sep = DateKey::parse("2024-9-1").unwrap();
        let oct = DateKey::parse("2024-10-1").unwrap();
        assert!(sep < oct);
    }
}
