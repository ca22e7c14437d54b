//! Calendar-day values and clocks.
//!
//! # Responsibility
//! - Represent a diary day with a canonical `YYYY-MM-DD` text form.
//! - Provide the local "today" used to anchor the projection window.
//!
//! # Invariants
//! - `DiaryDate` text form is always fixed-width ISO-8601 full date.
//! - Parsing never accepts time components or non-padded fields.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid iso date regex"));

/// Error returned when a date string is not a valid diary date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    /// Input does not have the `YYYY-MM-DD` shape.
    InvalidFormat(String),
    /// Input has the right shape but names no calendar day.
    InvalidDate(String),
}

impl Display for DateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat(value) => {
                write!(f, "invalid date format `{value}`; expected YYYY-MM-DD")
            }
            Self::InvalidDate(value) => write!(f, "invalid calendar date `{value}`"),
        }
    }
}

impl Error for DateParseError {}

/// One calendar day in the local calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiaryDate(NaiveDate);

impl DiaryDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses strict `YYYY-MM-DD` text.
    pub fn parse(value: &str) -> Result<Self, DateParseError> {
        if !ISO_DATE_RE.is_match(value) {
            return Err(DateParseError::InvalidFormat(value.to_string()));
        }
        NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
            .map(Self)
            .map_err(|_| DateParseError::InvalidDate(value.to_string()))
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Returns the canonical `YYYY-MM-DD` form.
    pub fn to_iso_string(&self) -> String {
        self.0.format(ISO_DATE_FORMAT).to_string()
    }
}

impl Display for DiaryDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(ISO_DATE_FORMAT))
    }
}

impl FromStr for DiaryDate {
    type Err = DateParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl From<NaiveDate> for DiaryDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl TryFrom<String> for DiaryDate {
    type Error = DateParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<DiaryDate> for String {
    fn from(value: DiaryDate) -> Self {
        value.to_iso_string()
    }
}

/// Source of the local calendar day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the device's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one day. Used by tests and the CLI demo.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
