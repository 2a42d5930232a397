//! Fire attribute records built from GetFeatureInfo responses.

use crate::constants::{FEATURE_DATE_TIME_FORMAT, FEATURE_INFO_FEATURE_COUNT, FEATURE_INFO_REQUEST_ID};
use crate::date_pattern::{format_date_time, parse_date_time};
use crate::models::feature::{Feature, ProxyResponse};
use crate::settings::LayerToFilter;
use serde::Serialize;
use serde_json::Value;

/// Attributes of one fire, ready to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FireAttributes {
    pub id: String,
    pub latitude: String,
    pub latitude_dms: String,
    pub longitude: String,
    pub longitude_dms: String,
    pub date_time: String,
    pub satellite: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub precipitation: String,
    pub days_without_precipitation: String,
    pub risk: String,
    pub biome: String,
    pub map_link: String,
}

/// Fire attribute dialog contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureInfoReport {
    pub title: &'static str,
    pub fires: Vec<FireAttributes>,
}

/// Append the feature limit to a widget-built GetFeatureInfo URL.
pub fn feature_info_url(url: &str) -> String {
    format!("{}&FEATURE_COUNT={}", url, FEATURE_INFO_FEATURE_COUNT)
}

fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn dms(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    let total_seconds = (value.abs() * 3600.0 * 10.0).round() / 10.0;
    let degrees = (total_seconds / 3600.0).floor();
    let minutes = ((total_seconds - degrees * 3600.0) / 60.0).floor();
    let seconds = total_seconds - degrees * 3600.0 - minutes * 60.0;
    format!("{}°{:02}'{:04.1}\" {}", degrees, minutes, seconds, hemisphere)
}

/// Latitude in degrees, minutes and seconds (`15°47'38.0" S`).
pub fn latitude_to_dms(value: f64) -> String {
    dms(value, 'N', 'S')
}

/// Longitude in degrees, minutes and seconds (`47°52'58.0" W`).
pub fn longitude_to_dms(value: f64) -> String {
    dms(value, 'E', 'W')
}

/// Reformat a feature timestamp from the layer's format to the display format.
///
/// ISO `T`/`Z` markers are stripped first; unparsable values pass through.
pub fn format_feature_date_time(raw: &str, source_format: &str) -> String {
    let cleaned = raw.replacen('T', " ", 1).replacen('Z', "", 1);
    match parse_date_time(&cleaned, source_format) {
        Some(value) => format_date_time(value, FEATURE_DATE_TIME_FORMAT),
        None => raw.to_string(),
    }
}

impl FireAttributes {
    pub fn from_feature(feature: &Feature, fields: &LayerToFilter) -> Self {
        let property = |name: &str| feature.properties.get(name);
        let latitude = text(property(&fields.latitude_field_name));
        let longitude = text(property(&fields.longitude_field_name));
        let latitude_dms = number(property(&fields.latitude_field_name))
            .map(latitude_to_dms)
            .unwrap_or_default();
        let longitude_dms = number(property(&fields.longitude_field_name))
            .map(longitude_to_dms)
            .unwrap_or_default();

        Self {
            id: text(property(&fields.id_field_name)),
            map_link: format!(
                "http://maps.google.com.br/maps?q={},{}&hl=pt-BR&t=h&z=10",
                latitude, longitude
            ),
            latitude,
            latitude_dms,
            longitude,
            longitude_dms,
            date_time: format_feature_date_time(
                &text(property(&fields.date_time_field_name)),
                &fields.date_time_format,
            ),
            satellite: text(property(&fields.satellite_field_name)),
            city: text(property(&fields.city_name_field_name)),
            state: text(property(&fields.state_name_field_name)),
            country: text(property(&fields.country_name_field_name)),
            precipitation: text(property(&fields.precipitation_field_name)),
            days_without_precipitation: text(
                property(&fields.number_of_days_without_precipitation_field_name),
            ),
            risk: text(property(&fields.risk_field_name)),
            biome: text(property(&fields.biome_field_name)),
        }
    }
}

/// Build the attribute report for a proxy response.
///
/// Returns `None` for other request ids or when no feature was hit.
pub fn feature_info_report(
    response: &ProxyResponse,
    fields: &LayerToFilter,
) -> Option<FeatureInfoReport> {
    if response.request_id != FEATURE_INFO_REQUEST_ID || response.msg.features.is_empty() {
        return None;
    }
    let fires: Vec<FireAttributes> = response
        .msg
        .features
        .iter()
        .map(|feature| FireAttributes::from_feature(feature, fields))
        .collect();
    Some(FeatureInfoReport {
        title: if fires.len() > 1 {
            "Fire attributes"
        } else {
            "Fire attribute"
        },
        fires,
    })
}
