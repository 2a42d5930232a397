//! Filter validation: dates, times, attribute selections and the filter epoch.

use crate::constants::FILTER_DATE_FORMAT;
use crate::date_pattern::{format_date, parse_date};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failure of the date/time filter inputs.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid dates!")]
    InvalidDates,
    #[error("Invalid times!")]
    InvalidTimes,
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// Build a window, rejecting reversed bounds.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, FilterError> {
        if from > to {
            return Err(FilterError::InvalidDates);
        }
        Ok(Self { from, to })
    }

    /// Parse two `YYYY/MM/DD` inputs.
    pub fn parse(from: &str, to: &str) -> Result<Self, FilterError> {
        let from = parse_date(from, FILTER_DATE_FORMAT).ok_or(FilterError::InvalidDates)?;
        let to = parse_date(to, FILTER_DATE_FORMAT).ok_or(FilterError::InvalidDates)?;
        Self::new(from, to)
    }

    /// Window bounds formatted back as filter inputs.
    pub fn formatted(&self, format: &str) -> (String, String) {
        (format_date(self.from, format), format_date(self.to, format))
    }
}

/// Start and end time of day applied to the first and last filtered days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            from: NaiveTime::MIN,
            to: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
        }
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

impl TimeWindow {
    /// Parse two `HH:MM[:SS]` inputs.
    pub fn parse(from: &str, to: &str) -> Result<Self, FilterError> {
        Ok(Self {
            from: parse_time(from).ok_or(FilterError::InvalidTimes)?,
            to: parse_time(to).ok_or(FilterError::InvalidTimes)?,
        })
    }
}

/// An attribute filter: everything, or an explicit set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    All,
    Only(Vec<String>),
}

impl Selection {
    /// Build a selection from form values; empty input or an `all` entry selects everything.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected = Vec::new();
        for value in values {
            let value = value.as_ref().trim();
            if value.eq_ignore_ascii_case("all") {
                return Selection::All;
            }
            if !value.is_empty() {
                selected.push(value.to_string());
            }
        }
        if selected.is_empty() {
            Selection::All
        } else {
            Selection::Only(selected)
        }
    }

    /// Query-string value: empty for everything, comma-joined otherwise.
    pub fn to_query_value(&self) -> String {
        match self {
            Selection::All => String::new(),
            Selection::Only(values) => values.join(","),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

/// Raw filter form values before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub date_from: String,
    pub date_to: String,
    pub time_from: String,
    pub time_to: String,
    pub satellites: Vec<String>,
    pub biomes: Vec<String>,
    pub countries: Vec<String>,
    pub states: Vec<String>,
    pub city: Option<String>,
}

/// A validated dashboard filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub dates: DateWindow,
    pub times: TimeWindow,
    pub satellites: Selection,
    pub biomes: Selection,
    pub countries: Selection,
    pub states: Selection,
    pub city: Option<String>,
    /// Set until the user applies a filter; satellites then come from `initial_satellites`.
    pub initial: bool,
    pub initial_satellites: Vec<String>,
}

impl Filter {
    /// Filter covering a single day with everything selected.
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            dates: DateWindow { from: day, to: day },
            times: TimeWindow::default(),
            satellites: Selection::All,
            biomes: Selection::All,
            countries: Selection::All,
            states: Selection::All,
            city: None,
            initial: false,
            initial_satellites: Vec::new(),
        }
    }

    /// Validate form values.
    ///
    /// # Errors
    /// [`FilterError::InvalidDates`] for unparsable or reversed dates,
    /// [`FilterError::InvalidTimes`] for unparsable times or a single-day
    /// window whose start time is after its end time.
    pub fn from_input(input: &FilterInput) -> Result<Self, FilterError> {
        let dates = DateWindow::parse(&input.date_from, &input.date_to)?;
        let times = TimeWindow::parse(&input.time_from, &input.time_to)?;
        if dates.from == dates.to && times.from > times.to {
            return Err(FilterError::InvalidTimes);
        }
        Ok(Self {
            dates,
            times,
            satellites: Selection::from_values(&input.satellites),
            biomes: Selection::from_values(&input.biomes),
            countries: Selection::from_values(&input.countries),
            states: Selection::from_values(&input.states),
            city: input
                .city
                .as_deref()
                .map(str::trim)
                .filter(|city| !city.is_empty())
                .map(str::to_string),
            initial: false,
            initial_satellites: Vec::new(),
        })
    }

    /// First and last instants covered by the filter.
    pub fn date_time_window(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.dates.from.and_time(self.times.from),
            self.dates.to.and_time(self.times.to),
        )
    }

    /// `dateTimeFrom`/`dateTimeTo` query values in the backend's date format.
    pub fn fires_date_time_range(&self, fires_date_format: &str) -> (String, String) {
        (
            format!(
                "{} {}",
                format_date(self.dates.from, fires_date_format),
                self.times.from.format("%H:%M:%S")
            ),
            format!(
                "{} {}",
                format_date(self.dates.to, fires_date_format),
                self.times.to.format("%H:%M:%S")
            ),
        )
    }

    /// Satellites query value, honoring the initial filter.
    pub fn satellites_query(&self) -> String {
        if self.initial {
            self.initial_satellites.join(",")
        } else {
            self.satellites.to_query_value()
        }
    }
}

/// Monotonic counter identifying the filter a request was issued for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FilterEpoch(pub u64);

impl FilterEpoch {
    /// The epoch following this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}
