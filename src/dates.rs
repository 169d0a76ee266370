use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// A named `strftime` pattern the normalizer accepts.
///
/// chrono's `%Y` takes any number of digits, so every format also pins the
/// digit count of its three fields. Input that does not have that shape is
/// never handed to chrono.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    pub name: &'static str,
    pub pattern: &'static str,
    separator: char,
    /// Inclusive (min, max) digit count per field, in pattern order.
    widths: [(usize, usize); 3],
}

impl DateFormat {
    fn matches_shape(&self, raw: &str) -> bool {
        let fields: Vec<&str> = raw.split(self.separator).collect();
        fields.len() == self.widths.len()
            && fields.iter().zip(self.widths).all(|(field, (min, max))| {
                (min..=max).contains(&field.len()) && field.bytes().all(|b| b.is_ascii_digit())
            })
    }
}

/// Accepted formats, tried in this order. The first one that parses wins.
pub const ACCEPTED_FORMATS: [DateFormat; 3] = [
    DateFormat {
        name: "us-short",
        pattern: "%m/%d/%y",
        separator: '/',
        widths: [(1, 2), (1, 2), (2, 2)],
    },
    DateFormat {
        name: "iso",
        pattern: "%Y-%m-%d",
        separator: '-',
        widths: [(4, 4), (1, 2), (1, 2)],
    },
    DateFormat {
        name: "day-first",
        pattern: "%d-%m-%Y",
        separator: '-',
        widths: [(1, 2), (1, 2), (4, 4)],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date {raw:?} (tried {})", .attempted.join(", "))]
pub struct DateParseError {
    pub raw: String,
    pub attempted: Vec<&'static str>,
}

/// Calendar date with no time-of-day component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedDate(NaiveDate);

impl NormalizedDate {
    #[cfg(test)]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    /// Whole years from `self` to `on`; `None` if `on` is earlier.
    pub fn years_until(&self, on: NormalizedDate) -> Option<u32> {
        on.0.years_since(self.0)
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey {
            year: self.0.year(),
            month: self.0.month(),
        }
    }

    /// Long form used in hover text, e.g. `Jan 15, 2025`.
    pub fn display_long(&self) -> String {
        self.0.format("%b %d, %Y").to_string()
    }
}

impl fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for NormalizedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Calendar month bucket, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn normalize(raw: &str) -> Result<NormalizedDate, DateParseError> {
    let trimmed = raw.trim();

    ACCEPTED_FORMATS
        .iter()
        .filter(|format| format.matches_shape(trimmed))
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format.pattern).ok())
        .map(NormalizedDate)
        .ok_or_else(|| DateParseError {
            raw: raw.to_string(),
            attempted: ACCEPTED_FORMATS.iter().map(|format| format.name).collect(),
        })
}
