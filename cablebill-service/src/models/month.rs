use chrono::{Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Calendar month key rendered as `YYYY-MM`.
///
/// Ordering is chronological, which also matches the lexical order of the
/// rendered form, so stores can sort on the string column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid month '{0}', expected YYYY-MM")]
pub struct MonthKeyError(pub String);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing "now" in UTC.
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The `n` months ending at `self` inclusive, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<MonthKey> {
        let mut months = Vec::with_capacity(n);
        let mut cursor = *self;
        for _ in 0..n {
            months.push(cursor);
            cursor = cursor.previous();
        }
        months.reverse();
        months
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MonthKeyError(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().all(|b| b.is_ascii_digit())
            || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let m = key("2025-03");
        assert_eq!(m.year(), 2025);
        assert_eq!(m.month(), 3);
        assert_eq!(m.to_string(), "2025-03");
    }

    #[test]
    fn test_rejects_malformed_months() {
        for bad in ["2025-3", "2025-13", "2025-00", "25-03", "2025/03", "2025-03-01", "", "abcd-ef"] {
            assert!(bad.parse::<MonthKey>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_previous_wraps_year() {
        assert_eq!(key("2025-01").previous(), key("2024-12"));
        assert_eq!(key("2025-07").previous(), key("2025-06"));
    }

    #[test]
    fn test_last_n_is_oldest_first_and_inclusive() {
        let window = key("2025-02").last_n(4);
        let rendered: Vec<String> = window.iter().map(|m| m.to_string()).collect();
        assert_eq!(rendered, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn test_ordering_is_chronological() {
        assert!(key("2024-12") < key("2025-01"));
        assert!(key("2025-10") > key("2025-09"));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&key("2025-04")).unwrap();
        assert_eq!(json, "\"2025-04\"");
        let back: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key("2025-04"));
        assert!(serde_json::from_str::<MonthKey>("\"2025-4\"").is_err());
    }
}
