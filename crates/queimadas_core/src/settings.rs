//! Dashboard configuration document (map, filter, graphics and application sections).

use crate::models::{
    graphic::GraphicConfig,
    layer::{LayerNode, RawLayerNode},
    satellite::SatelliteConfig,
    subtitle::SubtitleConfig,
};
use crate::widget::Extent;
use crate::{AppError, Config};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Attribute names of the layer the filter applies to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LayerToFilter {
    pub layer_id: String,
    pub id_field_name: String,
    pub latitude_field_name: String,
    pub longitude_field_name: String,
    pub date_time_field_name: String,
    pub date_time_format: String,
    pub satellite_field_name: String,
    pub city_name_field_name: String,
    pub state_name_field_name: String,
    pub country_name_field_name: String,
    pub precipitation_field_name: String,
    pub number_of_days_without_precipitation_field_name: String,
    pub risk_field_name: String,
    pub biome_field_name: String,
}

impl Default for LayerToFilter {
    fn default() -> Self {
        Self {
            layer_id: String::new(),
            id_field_name: "foco_id".to_string(),
            latitude_field_name: "latitude".to_string(),
            longitude_field_name: "longitude".to_string(),
            date_time_field_name: "data_hora_gmt".to_string(),
            date_time_format: "YYYY-MM-DD HH:II:SS".to_string(),
            satellite_field_name: "satelite".to_string(),
            city_name_field_name: "municipio".to_string(),
            state_name_field_name: "estado".to_string(),
            country_name_field_name: "pais".to_string(),
            precipitation_field_name: "precipitacao".to_string(),
            number_of_days_without_precipitation_field_name: "numero_dias_sem_chuva".to_string(),
            risk_field_name: "risco_fogo".to_string(),
            biome_field_name: "bioma".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMapConfigurations {
    #[serde(default)]
    layers: Vec<RawLayerNode>,
    #[serde(default)]
    subtitles: Vec<SubtitleConfig>,
    #[serde(default)]
    use_layer_groups_in_the_layer_explorer: bool,
    #[serde(default)]
    enable_add_and_remove_layers: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFilterConfigurations {
    #[serde(default)]
    satellites: Vec<SatelliteConfig>,
    #[serde(default)]
    layer_to_filter: LayerToFilter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawGraphicsConfigurations {
    #[serde(default)]
    fires_count: Vec<GraphicConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawApplicationConfigurations {
    #[serde(default)]
    continent_extent: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfigurations {
    #[serde(default = "default_fires_date_format")]
    fires_date_format: String,
    #[serde(default)]
    map_configurations: RawMapConfigurations,
    #[serde(default)]
    filter_configurations: RawFilterConfigurations,
    #[serde(default)]
    graphics_configurations: RawGraphicsConfigurations,
    #[serde(default)]
    application_configurations: RawApplicationConfigurations,
}

fn default_fires_date_format() -> String {
    "YYYY-MM-DD".to_string()
}

/// Map section: layer tree, legends and layer-explorer options.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfigurations {
    pub layers: Vec<LayerNode>,
    pub subtitles: Vec<SubtitleConfig>,
    pub use_layer_groups_in_the_layer_explorer: bool,
    pub enable_add_and_remove_layers: bool,
}

/// Filter section: satellites and the filtered layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfigurations {
    pub satellites: Vec<SatelliteConfig>,
    pub layer_to_filter: LayerToFilter,
}

/// Validated dashboard configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Configurations {
    pub fires_date_format: String,
    pub map: MapConfigurations,
    pub filter: FilterConfigurations,
    pub graphics: Vec<GraphicConfig>,
    pub continent_extent: Option<Extent>,
}

fn collect_leaf_ids<'a>(
    nodes: &'a [LayerNode],
    seen: &mut HashSet<&'a str>,
) -> Result<(), AppError> {
    for node in nodes {
        match node {
            LayerNode::Group(group) => collect_leaf_ids(&group.children, seen)?,
            LayerNode::Leaf(layer) => {
                if !seen.insert(layer.id.as_str()) {
                    return Err(AppError::invalid_config(format!(
                        "layer id '{}' is configured more than once",
                        layer.id
                    )));
                }
            }
        }
    }
    Ok(())
}

impl Configurations {
    /// Parse and validate a configuration document.
    ///
    /// # Errors
    /// Returns [`AppError::Json`] for malformed JSON and
    /// [`AppError::InvalidConfig`] when a layer, graphic or extent fails validation.
    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let raw: RawConfigurations = serde_json::from_str(text)?;
        Self::validate(raw)
    }

    /// Read, parse and validate a configuration document from disk.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        let configurations = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            layers = configurations.map.layers.len(),
            subtitles = configurations.map.subtitles.len(),
            graphics = configurations.graphics.len(),
            "loaded dashboard configuration"
        );
        Ok(configurations)
    }

    /// Apply runtime overrides from [`Config`].
    pub fn apply_overrides(&mut self, config: &Config) {
        if let Some(use_layer_groups) = config.use_layer_groups {
            self.map.use_layer_groups_in_the_layer_explorer = use_layer_groups;
        }
    }

    fn validate(raw: RawConfigurations) -> Result<Self, AppError> {
        let layers = raw
            .map_configurations
            .layers
            .into_iter()
            .map(LayerNode::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        collect_leaf_ids(&layers, &mut HashSet::new())?;

        let mut graphic_ids = HashSet::new();
        for graphic in &raw.graphics_configurations.fires_count {
            if !graphic_ids.insert(graphic.id.as_str()) {
                return Err(AppError::invalid_config(format!(
                    "graphic id '{}' is configured more than once",
                    graphic.id
                )));
            }
        }

        if let Some(satellite) = raw
            .filter_configurations
            .satellites
            .iter()
            .find(|satellite| satellite.is_reversed())
        {
            return Err(AppError::invalid_config(format!(
                "satellite '{}' ends before it begins",
                satellite.id
            )));
        }

        let continent_extent = match raw.application_configurations.continent_extent {
            Some(values) => Some(Extent::try_from(values.as_slice())?),
            None => None,
        };

        Ok(Self {
            fires_date_format: raw.fires_date_format,
            map: MapConfigurations {
                layers,
                subtitles: raw.map_configurations.subtitles,
                use_layer_groups_in_the_layer_explorer: raw
                    .map_configurations
                    .use_layer_groups_in_the_layer_explorer,
                enable_add_and_remove_layers: raw.map_configurations.enable_add_and_remove_layers,
            },
            filter: FilterConfigurations {
                satellites: raw.filter_configurations.satellites,
                layer_to_filter: raw.filter_configurations.layer_to_filter,
            },
            graphics: raw.graphics_configurations.fires_count,
            continent_extent,
        })
    }
}
