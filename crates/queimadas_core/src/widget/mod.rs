//! Capability traits of the externally-owned map widget and layer explorer.
//!
//! The dashboard never renders anything itself: it forwards layer requests to
//! a [`MapWidget`] and mirrors the registry into a [`LayerExplorer`] tree.

mod headless;

pub use headless::{HeadlessExplorer, HeadlessLayer, HeadlessMap};

use crate::models::layer::{CustomParams, ResolutionRange, TileMatrixParams, TiledImageryParams};
use crate::AppError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Extra WMS source parameters (`STYLES`, time keys).
pub type SourceParams = BTreeMap<String, String>;

/// Map extent as `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent(pub [f64; 4]);

impl TryFrom<&[f64]> for Extent {
    type Error = AppError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let bounds: [f64; 4] = values.try_into().map_err(|_| {
            AppError::invalid_config(format!(
                "extent needs 4 coordinates, got {}",
                values.len()
            ))
        })?;
        if bounds[0] > bounds[2] || bounds[1] > bounds[3] {
            return Err(AppError::invalid_config(format!(
                "extent {:?} has reversed bounds",
                bounds
            )));
        }
        Ok(Self(bounds))
    }
}

/// Fields shared by every layer render request; names and times are already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor<'a> {
    pub id: &'a str,
    pub name: String,
    pub title: String,
    pub visible: bool,
    pub disabled: bool,
    pub parent_id: &'a str,
    pub append_at_the_end: bool,
    pub time: Option<String>,
    pub resolution: ResolutionRange,
}

/// Node registered in the layer explorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorerNode<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub parent_id: &'a str,
    pub is_group: bool,
    pub append_at_the_end: bool,
    pub classes: Option<&'a Value>,
    pub style: Option<&'a Value>,
}

/// Map tools bound to mouse interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapTool {
    Move,
    DragBox,
    FeatureInfo,
}

/// Rendering surface that owns the drawn layers.
///
/// `add_*` methods return `false` when the widget refuses the layer.
pub trait MapWidget {
    fn add_tile_layer(
        &mut self,
        layer: &LayerDescriptor<'_>,
        params: &TiledImageryParams,
        source_params: &SourceParams,
    ) -> bool;
    fn add_wmts_layer(&mut self, layer: &LayerDescriptor<'_>, params: &TileMatrixParams) -> bool;
    fn add_custom_layer(&mut self, layer: &LayerDescriptor<'_>, params: &CustomParams) -> bool;
    fn add_layer_group(&mut self, id: &str, name: &str, parent_id: &str) -> bool;
    fn remove_layer(&mut self, id: &str) -> bool;

    fn set_layer_visibility(&mut self, id: &str, visible: bool);
    fn is_layer_visible(&self, id: &str) -> bool;
    fn is_resolution_valid_for_layer(&self, id: &str) -> bool;

    fn update_layer_time(&mut self, id: &str, time: &str, tile_matrix: Option<&TileMatrixParams>);
    fn update_layer_source_params(&mut self, id: &str, params: &SourceParams);
    fn update_layer_name(&mut self, id: &str, name: &str);

    fn zoom_to_extent(&mut self, extent: Extent);
    fn add_zoom_drag_box(&mut self);
    fn remove_zoom_drag_box(&mut self);
    /// Arm the single-click tool that builds GetFeatureInfo URLs for `layer_id`.
    fn set_feature_info_on_click(&mut self, layer_id: &str);
    fn unset_single_click(&mut self);
}

/// Tree UI mirroring the layer registry.
pub trait LayerExplorer {
    fn add_node(&mut self, node: ExplorerNode<'_>);
    fn remove_node(&mut self, id: &str, parent_id: Option<&str>);
    /// Names of the groups enclosing `id`, outermost first.
    fn parent_names(&self, id: &str) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::Extent;

    #[test]
    fn extent_requires_four_ordered_coordinates() {
        assert_eq!(
            Extent::try_from([-90.0, -60.0, -30.0, 15.0].as_slice()).expect("extent"),
            Extent([-90.0, -60.0, -30.0, 15.0])
        );
        assert!(Extent::try_from([1.0, 2.0, 3.0].as_slice()).is_err());
        assert!(Extent::try_from([10.0, 0.0, 5.0, 1.0].as_slice()).is_err());
    }
}
