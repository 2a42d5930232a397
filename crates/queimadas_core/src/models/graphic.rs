//! Fires-count graphic configuration and API payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Visibility rules attached to a graphic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRules {
    #[serde(default)]
    pub ignore_country_filter: bool,
    #[serde(default)]
    pub ignore_state_filter: bool,
    #[serde(default)]
    pub ignore_city_filter: bool,
    #[serde(default)]
    pub show_only_if_there_is_a_country_filtered: bool,
    #[serde(default)]
    pub show_only_if_there_is_no_country_filtered: bool,
    #[serde(default)]
    pub show_only_if_there_is_a_state_filtered: bool,
    #[serde(default)]
    pub show_only_if_there_is_no_state_filtered: bool,
}

impl FilterRules {
    /// Whether the show-only rules hide the graphic for the given spatial filter.
    ///
    /// Empty strings mean "no country/state filtered".
    pub fn hides_for(&self, countries: &str, states: &str) -> bool {
        (self.show_only_if_there_is_a_country_filtered && countries.is_empty())
            || (self.show_only_if_there_is_no_country_filtered && !countries.is_empty())
            || (self.show_only_if_there_is_a_state_filtered && states.is_empty())
            || (self.show_only_if_there_is_no_state_filtered && !states.is_empty())
    }
}

/// A configured fires-count graphic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GraphicConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub expanded: bool,
    /// Label template with `{field}` placeholders.
    pub y: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub ignore_country_filter: bool,
    #[serde(default)]
    pub ignore_state_filter: bool,
    #[serde(default)]
    pub ignore_city_filter: bool,
    #[serde(default)]
    pub show_only_if_there_is_a_country_filtered: bool,
    #[serde(default)]
    pub show_only_if_there_is_no_country_filtered: bool,
    #[serde(default)]
    pub show_only_if_there_is_a_state_filtered: bool,
    #[serde(default)]
    pub show_only_if_there_is_no_state_filtered: bool,
}

impl GraphicConfig {
    pub fn filter_rules(&self) -> FilterRules {
        FilterRules {
            ignore_country_filter: self.ignore_country_filter,
            ignore_state_filter: self.ignore_state_filter,
            ignore_city_filter: self.ignore_city_filter,
            show_only_if_there_is_a_country_filtered: self.show_only_if_there_is_a_country_filtered,
            show_only_if_there_is_no_country_filtered: self
                .show_only_if_there_is_no_country_filtered,
            show_only_if_there_is_a_state_filtered: self.show_only_if_there_is_a_state_filtered,
            show_only_if_there_is_no_state_filtered: self.show_only_if_there_is_no_state_filtered,
        }
    }
}

/// Rows returned by an aggregate query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSet {
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
    #[serde(default)]
    pub row_count: usize,
}

/// Response of `GET /graphicsfirescount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiresCountResponse {
    pub fires_count: RowSet,
    pub fires_total_count: RowSet,
    pub y: String,
    pub id: String,
    #[serde(default)]
    pub filter_rules: FilterRules,
}

impl FiresCountResponse {
    /// Total fire count from the first `firesTotalCount` row.
    pub fn total_count(&self) -> f64 {
        self.fires_total_count
            .rows
            .first()
            .and_then(row_count_value)
            .unwrap_or(0.0)
    }
}

/// Numeric `count` column of a row; the backend may send it as a string.
pub fn row_count_value(row: &Map<String, Value>) -> Option<f64> {
    match row.get("count")? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn show_only_rules_match_spatial_filter_state() {
        let country_only = FilterRules {
            show_only_if_there_is_a_country_filtered: true,
            ..FilterRules::default()
        };
        assert!(country_only.hides_for("", ""));
        assert!(!country_only.hides_for("33", ""));

        let no_state = FilterRules {
            show_only_if_there_is_no_state_filtered: true,
            ..FilterRules::default()
        };
        assert!(no_state.hides_for("33", "51"));
        assert!(!no_state.hides_for("33", ""));
        assert!(!FilterRules::default().hides_for("33", "51"));
    }

    #[test]
    fn response_decodes_string_and_numeric_counts() {
        let response: FiresCountResponse = serde_json::from_value(json!({
            "firesCount": { "rows": [{ "satelite": "AQUA", "count": "12" }], "rowCount": 1 },
            "firesTotalCount": { "rows": [{ "count": 40 }], "rowCount": 1 },
            "y": "{satelite}",
            "id": "firesBySatellite",
            "filterRules": { "showOnlyIfThereIsNoStateFiltered": true }
        }))
        .expect("response");

        assert_eq!(response.total_count(), 40.0);
        assert_eq!(row_count_value(&response.fires_count.rows[0]), Some(12.0));
        assert!(response.filter_rules.show_only_if_there_is_no_state_filtered);
    }
}
