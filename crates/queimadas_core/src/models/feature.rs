//! Feature-info payloads relayed through the backend proxy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single feature returned by a GetFeatureInfo query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// GeoJSON-like feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Envelope returned by `GET /proxy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub request_id: String,
    pub msg: FeatureCollection,
}
