//! Satellite operational windows used to pick legend rows.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A configured satellite and the dates it produced data.
///
/// Missing or empty `Begin`/`End` mean "today".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SatelliteConfig {
    pub id: String,
    #[serde(default, deserialize_with = "optional_day")]
    pub begin: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_day")]
    pub end: Option<NaiveDate>,
}

fn optional_day<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|err| {
                serde::de::Error::custom(format!("invalid satellite date '{}': {}", value, err))
            }),
    }
}

impl SatelliteConfig {
    /// Operational window with open ends resolved to `today`.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.begin.unwrap_or(today), self.end.unwrap_or(today))
    }

    /// Whether `begin` comes after `end` once both are configured.
    pub fn is_reversed(&self) -> bool {
        matches!((self.begin, self.end), (Some(begin), Some(end)) if begin > end)
    }

    /// Whether the operational window intersects `[from, to]`.
    ///
    /// A window that resolves empty, such as a future `Begin` with an open
    /// `End`, is never active.
    pub fn is_active_between(&self, from: NaiveDate, to: NaiveDate, today: NaiveDate) -> bool {
        let (begin, end) = self.window(today);
        begin <= end && begin <= to && end >= from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn satellite(begin: &str, end: &str) -> SatelliteConfig {
        serde_json::from_value(json!({ "Id": "S", "Begin": begin, "End": end }))
            .expect("satellite")
    }

    #[test]
    fn overlap_matrix_covers_all_four_cases_and_disjoint_windows() {
        let today = day(2024, 6, 1);
        let from = day(2020, 1, 10);
        let to = day(2020, 1, 20);
        let cases = [
            ("2020-01-01", "2020-01-15", true),  // crosses the start
            ("2020-01-15", "2020-01-30", true),  // crosses the end
            ("2020-01-12", "2020-01-18", true),  // inside the filter
            ("2019-01-01", "2021-01-01", true),  // contains the filter
            ("2020-02-01", "2020-02-10", false), // after
            ("2019-12-01", "2020-01-09", false), // before
            ("2020-01-20", "2020-01-20", true),  // touches the last day
        ];

        for (begin, end, expected) in cases {
            assert_eq!(
                satellite(begin, end).is_active_between(from, to, today),
                expected,
                "window {}..{}",
                begin,
                end
            );
        }
    }

    #[test]
    fn empty_dates_resolve_to_today() {
        let today = day(2024, 6, 1);
        let ongoing = satellite("2019-01-01", "");
        assert_eq!(ongoing.window(today), (day(2019, 1, 1), today));
        assert!(ongoing.is_active_between(day(2024, 5, 30), day(2024, 6, 1), today));

        let missing: SatelliteConfig =
            serde_json::from_value(json!({ "Id": "NPP" })).expect("satellite");
        assert_eq!(missing.window(today), (today, today));
    }

    #[test]
    fn future_begin_with_open_end_is_inactive() {
        let today = day(2017, 3, 1);
        let upcoming = satellite("2018-01-01", "");
        assert!(!upcoming.is_active_between(today, today, today));
        assert!(!upcoming.is_active_between(day(2016, 1, 1), day(2019, 1, 1), today));

        let reversed = satellite("2018-01-01", "2017-01-01");
        assert!(reversed.is_reversed());
        assert!(!reversed.is_active_between(day(2017, 1, 1), day(2017, 1, 1), today));
        assert!(!satellite("2017-01-01", "").is_reversed());
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let result: Result<SatelliteConfig, _> =
            serde_json::from_value(json!({ "Id": "S", "Begin": "2020/01/01" }));
        assert!(result.is_err());
    }
}
