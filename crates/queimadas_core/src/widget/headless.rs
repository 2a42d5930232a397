//! In-memory widget implementations used by the CLI and tests.

use super::{Extent, ExplorerNode, LayerDescriptor, LayerExplorer, MapWidget, SourceParams};
use crate::constants::ROOT_EXPLORER_ID;
use crate::models::layer::{CustomParams, ResolutionRange, TileMatrixParams, TiledImageryParams};
use std::collections::{BTreeMap, HashSet};

/// A layer drawn by [`HeadlessMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessLayer {
    pub name: String,
    pub title: String,
    pub parent_id: String,
    pub kind: &'static str,
    pub visible: bool,
    pub resolution: ResolutionRange,
    pub time: Option<String>,
    pub source_params: SourceParams,
}

/// Map widget that keeps layers in memory and evaluates resolution ranges
/// against a settable current resolution.
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    layers: BTreeMap<String, HeadlessLayer>,
    groups: BTreeMap<String, String>,
    draw_order: Vec<String>,
    resolution: f64,
    refused: HashSet<String>,
    extent: Option<Extent>,
    drag_box: bool,
    feature_info_layer: Option<String>,
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl HeadlessMap {
    pub fn new(resolution: f64) -> Self {
        Self {
            layers: BTreeMap::new(),
            groups: BTreeMap::new(),
            draw_order: Vec::new(),
            resolution,
            refused: HashSet::new(),
            extent: None,
            drag_box: false,
            feature_info_layer: None,
        }
    }

    /// Make every later `add_*` call for `id` fail.
    pub fn refuse(&mut self, id: &str) {
        self.refused.insert(id.to_string());
    }

    pub fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn layer(&self, id: &str) -> Option<&HeadlessLayer> {
        self.layers.get(id)
    }

    /// Layer ids in the order they were added.
    pub fn draw_order(&self) -> &[String] {
        &self.draw_order
    }

    pub fn has_group(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    pub fn drag_box_active(&self) -> bool {
        self.drag_box
    }

    pub fn feature_info_layer(&self) -> Option<&str> {
        self.feature_info_layer.as_deref()
    }

    fn insert(&mut self, layer: &LayerDescriptor<'_>, kind: &'static str, params: SourceParams) -> bool {
        if self.refused.contains(layer.id) || self.layers.contains_key(layer.id) {
            return false;
        }
        self.layers.insert(
            layer.id.to_string(),
            HeadlessLayer {
                name: layer.name.clone(),
                title: layer.title.clone(),
                parent_id: layer.parent_id.to_string(),
                kind,
                visible: layer.visible,
                resolution: layer.resolution,
                time: layer.time.clone(),
                source_params: params,
            },
        );
        self.draw_order.push(layer.id.to_string());
        true
    }
}

impl MapWidget for HeadlessMap {
    fn add_tile_layer(
        &mut self,
        layer: &LayerDescriptor<'_>,
        _params: &TiledImageryParams,
        source_params: &SourceParams,
    ) -> bool {
        self.insert(layer, "wms", source_params.clone())
    }

    fn add_wmts_layer(&mut self, layer: &LayerDescriptor<'_>, _params: &TileMatrixParams) -> bool {
        self.insert(layer, "wmts", SourceParams::new())
    }

    fn add_custom_layer(&mut self, layer: &LayerDescriptor<'_>, _params: &CustomParams) -> bool {
        self.insert(layer, "custom", SourceParams::new())
    }

    fn add_layer_group(&mut self, id: &str, name: &str, _parent_id: &str) -> bool {
        if self.refused.contains(id) || self.groups.contains_key(id) {
            return false;
        }
        self.groups.insert(id.to_string(), name.to_string());
        true
    }

    fn remove_layer(&mut self, id: &str) -> bool {
        self.draw_order.retain(|existing| existing != id);
        self.layers.remove(id).is_some()
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) {
        if let Some(layer) = self.layers.get_mut(id) {
            layer.visible = visible;
        }
    }

    fn is_layer_visible(&self, id: &str) -> bool {
        self.layers.get(id).is_some_and(|layer| layer.visible)
    }

    fn is_resolution_valid_for_layer(&self, id: &str) -> bool {
        self.layers
            .get(id)
            .is_some_and(|layer| layer.resolution.contains(self.resolution))
    }

    fn update_layer_time(&mut self, id: &str, time: &str, _tile_matrix: Option<&TileMatrixParams>) {
        if let Some(layer) = self.layers.get_mut(id) {
            layer.time = Some(time.to_string());
        }
    }

    fn update_layer_source_params(&mut self, id: &str, params: &SourceParams) {
        if let Some(layer) = self.layers.get_mut(id) {
            layer
                .source_params
                .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    fn update_layer_name(&mut self, id: &str, name: &str) {
        if let Some(layer) = self.layers.get_mut(id) {
            layer.name = name.to_string();
        }
    }

    fn zoom_to_extent(&mut self, extent: Extent) {
        self.extent = Some(extent);
    }

    fn add_zoom_drag_box(&mut self) {
        self.drag_box = true;
    }

    fn remove_zoom_drag_box(&mut self) {
        self.drag_box = false;
    }

    fn set_feature_info_on_click(&mut self, layer_id: &str) {
        self.feature_info_layer = Some(layer_id.to_string());
    }

    fn unset_single_click(&mut self) {
        self.feature_info_layer = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ExplorerEntry {
    name: String,
    parent_id: String,
    is_group: bool,
}

/// Layer explorer tree kept in memory.
#[derive(Debug, Clone, Default)]
pub struct HeadlessExplorer {
    nodes: BTreeMap<String, ExplorerEntry>,
}

impl HeadlessExplorer {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|entry| entry.parent_id.as_str())
    }

    /// Ids of the layer (non-group) nodes.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, entry)| !entry.is_group)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Group ids that have no children left; the UI hides these.
    pub fn empty_groups(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(id, entry)| {
                entry.is_group
                    && !self
                        .nodes
                        .values()
                        .any(|child| child.parent_id == id.as_str())
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

impl LayerExplorer for HeadlessExplorer {
    fn add_node(&mut self, node: ExplorerNode<'_>) {
        self.nodes.insert(
            node.id.to_string(),
            ExplorerEntry {
                name: node.name.to_string(),
                parent_id: node.parent_id.to_string(),
                is_group: node.is_group,
            },
        );
    }

    fn remove_node(&mut self, id: &str, _parent_id: Option<&str>) {
        self.nodes.remove(id);
    }

    fn parent_names(&self, id: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.nodes.get(id).map(|entry| entry.parent_id.as_str());
        while let Some(parent_id) = current {
            if parent_id == ROOT_EXPLORER_ID || !visited.insert(parent_id) {
                break;
            }
            let Some(parent) = self.nodes.get(parent_id) else {
                break;
            };
            names.push(parent.name.clone());
            current = Some(parent.parent_id.as_str());
        }
        names.reverse();
        names
    }
}
