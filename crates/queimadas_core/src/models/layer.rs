//! Map layer configuration: raw document shape and the validated layer kinds.

use crate::AppError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Custom-rendering function name that needs Bing imagery parameters.
pub const BING_MAPS_FUNCTION: &str = "addBingMapsLayer";

/// Layer or layer group as written in the configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawLayerNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub layer_group: bool,
    #[serde(default)]
    pub layers: Vec<RawLayerNode>,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub adds_in_the_start: bool,
    #[serde(default)]
    pub append_at_the_end: bool,
    #[serde(default)]
    pub dont_add_to_layer_explorer: bool,
    #[serde(default)]
    pub wmts: bool,
    #[serde(default)]
    pub params: Option<RawLayerParams>,
}

/// Rendering parameters as written in the configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawLayerParams {
    pub url: Option<String>,
    pub server_type: Option<String>,
    pub time: Option<String>,
    pub time_year: Option<String>,
    pub time_month: Option<String>,
    pub time_day: Option<String>,
    pub styles: Option<String>,
    pub buffer: Option<u32>,
    pub version: Option<String>,
    pub format: Option<String>,
    pub tile_grid: Option<Value>,
    pub matrix_set: Option<String>,
    pub min_resolution: Option<f64>,
    pub max_resolution: Option<f64>,
    pub classes: Option<Value>,
    pub style: Option<Value>,
    #[serde(rename = "TerraMA2WebComponentsFunction", alias = "Function")]
    pub function: Option<String>,
    pub imagery_set: Option<String>,
    pub bing_maps_key: Option<String>,
    pub min_time_for_todays_image: Option<String>,
}

/// Resolution interval in which a layer is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResolutionRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ResolutionRange {
    /// Lower bound inclusive, upper bound exclusive; missing bounds are open.
    pub fn contains(&self, resolution: f64) -> bool {
        self.min.map_or(true, |min| resolution >= min)
            && self.max.map_or(true, |max| resolution < max)
    }
}

/// Source-parameter keys that receive the year, month and day of the layer time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeParamKeys {
    pub year: String,
    pub month: String,
    pub day: String,
}

/// Tiled WMS imagery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiledImageryParams {
    pub url: String,
    pub server_type: Option<String>,
    pub time: Option<String>,
    pub time_params: Option<TimeParamKeys>,
    pub styles: Option<String>,
    pub buffer: Option<u32>,
    pub version: Option<String>,
    pub format: Option<String>,
    pub tile_grid: Option<Value>,
}

/// WMTS (tile matrix) imagery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileMatrixParams {
    pub url: String,
    pub format: String,
    pub matrix_set: String,
    pub time: Option<String>,
    pub tile_grid: Option<Value>,
}

/// Bing imagery parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BingImagery {
    pub imagery_set: String,
    pub key: String,
}

/// A layer drawn by a named widget function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomParams {
    pub function: String,
    pub imagery: Option<BingImagery>,
}

/// Rendering strategy of a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerKind {
    TiledImagery(TiledImageryParams),
    TileMatrixImagery(TileMatrixParams),
    CustomRendered(CustomParams),
}

impl LayerKind {
    /// Short label used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::TiledImagery(_) => "wms",
            LayerKind::TileMatrixImagery(_) => "wmts",
            LayerKind::CustomRendered(_) => "custom",
        }
    }
}

/// A validated leaf layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerConfig {
    pub id: String,
    pub name: String,
    pub title: String,
    pub visible: bool,
    pub disabled: bool,
    pub background: bool,
    pub adds_in_the_start: bool,
    pub append_at_the_end: bool,
    pub dont_add_to_layer_explorer: bool,
    pub resolution: ResolutionRange,
    pub classes: Option<Value>,
    pub style: Option<Value>,
    pub min_time_for_todays_image: Option<NaiveTime>,
    pub kind: LayerKind,
}

impl LayerConfig {
    /// Configured time (possibly holding a date placeholder).
    pub fn time(&self) -> Option<&str> {
        match &self.kind {
            LayerKind::TiledImagery(params) => params.time.as_deref(),
            LayerKind::TileMatrixImagery(params) => params.time.as_deref(),
            LayerKind::CustomRendered(_) => None,
        }
    }

    /// Element id used by the layer explorer: the layer id without its first `:`.
    pub fn element_id(&self) -> String {
        element_id_for(&self.id)
    }
}

/// Element id for a layer id: the id without its first `:`.
pub fn element_id_for(layer_id: &str) -> String {
    layer_id.replacen(':', "", 1)
}

/// A validated layer group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerGroupConfig {
    pub id: String,
    pub name: String,
    pub dont_add_to_layer_explorer: bool,
    pub classes: Option<Value>,
    pub style: Option<Value>,
    pub children: Vec<LayerNode>,
}

/// Node of the configured layer tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum LayerNode {
    Group(LayerGroupConfig),
    Leaf(LayerConfig),
}

impl LayerNode {
    pub fn id(&self) -> &str {
        match self {
            LayerNode::Group(group) => &group.id,
            LayerNode::Leaf(layer) => &layer.id,
        }
    }
}

/// Parent group a leaf layer is attached to in the layer explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    pub id: String,
    pub name: String,
}

/// A leaf layer held by the registry, with its resolved parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub config: LayerConfig,
    pub parent: ParentRef,
    /// Last time pushed to the widget, with placeholders resolved.
    pub current_time: Option<String>,
}

impl Layer {
    pub fn new(config: LayerConfig, parent: ParentRef) -> Self {
        Self {
            config,
            parent,
            current_time: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn require(value: Option<String>, layer_id: &str, field: &str) -> Result<String, AppError> {
    non_empty(value).ok_or_else(|| {
        AppError::invalid_config(format!("layer '{}' is missing Params.{}", layer_id, field))
    })
}

fn parse_cutoff(value: Option<String>, layer_id: &str) -> Result<Option<NaiveTime>, AppError> {
    let Some(raw) = non_empty(value) else {
        return Ok(None);
    };
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M"))
        .map(Some)
        .map_err(|_| {
            AppError::invalid_config(format!(
                "layer '{}' has an invalid MinTimeForTodaysImage '{}'",
                layer_id, raw
            ))
        })
}

fn layer_kind(raw: &RawLayerNode, params: RawLayerParams) -> Result<LayerKind, AppError> {
    let id = raw.id.as_str();
    if let Some(function) = non_empty(params.function) {
        let imagery = if function == BING_MAPS_FUNCTION {
            Some(BingImagery {
                imagery_set: require(params.imagery_set, id, "ImagerySet")?,
                key: require(params.bing_maps_key, id, "BingMapsKey")?,
            })
        } else {
            None
        };
        return Ok(LayerKind::CustomRendered(CustomParams { function, imagery }));
    }

    if raw.wmts {
        return Ok(LayerKind::TileMatrixImagery(TileMatrixParams {
            url: require(params.url, id, "Url")?,
            format: require(params.format, id, "Format")?,
            matrix_set: require(params.matrix_set, id, "MatrixSet")?,
            time: non_empty(params.time),
            tile_grid: params.tile_grid,
        }));
    }

    let time_params = match (
        non_empty(params.time_year),
        non_empty(params.time_month),
        non_empty(params.time_day),
    ) {
        (Some(year), Some(month), Some(day)) => Some(TimeParamKeys { year, month, day }),
        (None, None, None) => None,
        _ => {
            return Err(AppError::invalid_config(format!(
                "layer '{}' must set all of Params.TimeYear, TimeMonth and TimeDay",
                id
            )))
        }
    };

    Ok(LayerKind::TiledImagery(TiledImageryParams {
        url: require(params.url, id, "Url")?,
        server_type: non_empty(params.server_type),
        time: non_empty(params.time),
        time_params,
        styles: non_empty(params.styles),
        buffer: params.buffer,
        version: non_empty(params.version),
        format: non_empty(params.format),
        tile_grid: params.tile_grid,
    }))
}

impl TryFrom<RawLayerNode> for LayerNode {
    type Error = AppError;

    fn try_from(mut raw: RawLayerNode) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err(AppError::invalid_config("layer entry without Id"));
        }

        if raw.layer_group {
            let children = std::mem::take(&mut raw.layers)
                .into_iter()
                .map(LayerNode::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            let params = raw.params.unwrap_or_default();
            return Ok(LayerNode::Group(LayerGroupConfig {
                name: non_empty(raw.name).unwrap_or_else(|| raw.id.clone()),
                id: raw.id,
                dont_add_to_layer_explorer: raw.dont_add_to_layer_explorer,
                classes: params.classes,
                style: params.style,
                children,
            }));
        }

        let name = require(raw.name.take(), &raw.id, "Name")
            .map_err(|_| AppError::invalid_config(format!("layer '{}' is missing Name", raw.id)))?;
        let params = raw.params.take().ok_or_else(|| {
            AppError::invalid_config(format!("layer '{}' is missing Params", raw.id))
        })?;
        let resolution = ResolutionRange {
            min: params.min_resolution,
            max: params.max_resolution,
        };
        let classes = params.classes.clone();
        let style = params.style.clone();
        let min_time_for_todays_image =
            parse_cutoff(params.min_time_for_todays_image.clone(), &raw.id)?;
        let kind = layer_kind(&raw, params)?;

        Ok(LayerNode::Leaf(LayerConfig {
            title: non_empty(raw.title).unwrap_or_else(|| name.clone()),
            name,
            id: raw.id,
            visible: raw.visible,
            disabled: raw.disabled,
            background: raw.background,
            adds_in_the_start: raw.adds_in_the_start,
            append_at_the_end: raw.append_at_the_end,
            dont_add_to_layer_explorer: raw.dont_add_to_layer_explorer,
            resolution,
            classes,
            style,
            min_time_for_todays_image,
            kind,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> Result<LayerNode, AppError> {
        let raw: RawLayerNode = serde_json::from_value(value).expect("raw layer");
        LayerNode::try_from(raw)
    }

    #[test]
    fn tiled_layer_validates_with_time_params() {
        let parsed = node(json!({
            "Id": "terrama2:fires",
            "Name": "Fires {{YYYY/MM/DD}}",
            "Visible": true,
            "Params": {
                "Url": "http://maps.example/wms",
                "Time": "{{YYYY-MM-DD}}",
                "TimeYear": "ano",
                "TimeMonth": "mes",
                "TimeDay": "dia",
                "MinResolution": 10.0
            }
        }))
        .expect("valid layer");

        let LayerNode::Leaf(layer) = parsed else {
            panic!("expected a leaf");
        };
        assert_eq!(layer.title, "Fires {{YYYY/MM/DD}}");
        assert_eq!(layer.time(), Some("{{YYYY-MM-DD}}"));
        assert_eq!(layer.element_id(), "terrama2fires");
        match layer.kind {
            LayerKind::TiledImagery(params) => {
                let keys = params.time_params.expect("time keys");
                assert_eq!(keys.year, "ano");
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn kind_selection_prefers_custom_function_then_wmts() {
        let custom = node(json!({
            "Id": "bing",
            "Name": "Bing",
            "Wmts": true,
            "Params": {
                "TerraMA2WebComponentsFunction": "addBingMapsLayer",
                "ImagerySet": "Aerial",
                "BingMapsKey": "k"
            }
        }))
        .expect("custom layer");
        assert!(matches!(
            custom,
            LayerNode::Leaf(LayerConfig { kind: LayerKind::CustomRendered(_), .. })
        ));

        let wmts = node(json!({
            "Id": "modis",
            "Name": "MODIS",
            "Wmts": true,
            "Params": { "Url": "http://tiles", "Format": "image/png", "MatrixSet": "EPSG4326" }
        }))
        .expect("wmts layer");
        assert!(matches!(
            wmts,
            LayerNode::Leaf(LayerConfig { kind: LayerKind::TileMatrixImagery(_), .. })
        ));
    }

    #[test]
    fn missing_required_fields_are_rejected_per_kind() {
        let cases = [
            (json!({ "Id": "a", "Name": "A", "Params": {} }), "Params.Url"),
            (
                json!({ "Id": "b", "Name": "B", "Wmts": true, "Params": { "Url": "u" } }),
                "Params.Format",
            ),
            (
                json!({
                    "Id": "c",
                    "Name": "C",
                    "Params": { "TerraMA2WebComponentsFunction": "addBingMapsLayer" }
                }),
                "Params.ImagerySet",
            ),
            (
                json!({ "Id": "d", "Name": "D", "Params": { "Url": "u", "TimeYear": "y" } }),
                "TimeYear, TimeMonth and TimeDay",
            ),
            (json!({ "Id": "e", "Params": { "Url": "u" } }), "missing Name"),
            (json!({ "Id": "f", "Name": "F" }), "missing Params"),
        ];

        for (value, fragment) in cases {
            let err = node(value).expect_err("invalid layer must be rejected");
            assert!(
                err.to_string().contains(fragment),
                "error '{}' should mention '{}'",
                err,
                fragment
            );
        }
    }

    #[test]
    fn groups_validate_children_recursively() {
        let parsed = node(json!({
            "Id": "base",
            "Name": "Base maps",
            "LayerGroup": true,
            "Layers": [
                { "Id": "osm", "Name": "OSM", "Background": true, "Params": { "Url": "u" } },
                { "Id": "sub", "LayerGroup": true, "Layers": [] }
            ]
        }))
        .expect("valid group");
        let LayerNode::Group(group) = parsed else {
            panic!("expected a group");
        };
        assert_eq!(group.children.len(), 2);
        assert_eq!(group.children[1].id(), "sub");
    }

    #[test]
    fn resolution_range_uses_half_open_bounds() {
        let range = ResolutionRange {
            min: Some(10.0),
            max: Some(100.0),
        };
        assert!(range.contains(10.0));
        assert!(range.contains(99.9));
        assert!(!range.contains(100.0));
        assert!(!range.contains(9.9));
        assert!(ResolutionRange::default().contains(1e9));
    }
}
