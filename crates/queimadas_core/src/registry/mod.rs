//! Layer registry: which layers are added to the map, which are not, and which are visible.
//!
//! The registry owns the leaf layers once the configuration tree is resolved;
//! the map widget only holds a rendering copy. Every mutation updates the
//! widget, the registry lists and the visible-layer entries under one `&mut`
//! borrow and emits events after all of them agree.

use crate::constants::{ROOT_EXPLORER_ID, ROOT_EXPLORER_NAME};
use crate::date_pattern::{
    format_date, format_from_string_with_date_pattern, parse_date,
    process_string_with_date_pattern, replace_date_pattern_with_string,
};
use crate::events::{DashboardEvent, EventSink, PendingEvents};
use crate::models::layer::{
    element_id_for, Layer, LayerKind, LayerNode, ParentRef, TiledImageryParams,
};
use crate::widget::{ExplorerNode, LayerDescriptor, LayerExplorer, MapWidget, SourceParams};
use crate::AppError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

/// Layer-explorer behavior taken from the map configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryOptions {
    pub use_layer_groups: bool,
    pub enable_add_and_remove_layers: bool,
}

/// A layer currently shown on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleLayerEntry {
    pub layer_id: String,
    pub layer_name: String,
    pub layer_title: String,
    pub parent_id: String,
    /// Enclosing group names, each followed by `" > "`.
    pub parent_name: String,
    pub element_id: String,
}

/// Group reached while resolving the configured tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub dont_add_to_layer_explorer: bool,
    pub classes: Option<Value>,
    pub style: Option<Value>,
}

/// Output of [`resolve_layer_tree`], in registration order.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeItem {
    Group(ResolvedGroup),
    Leaf(Layer),
}

/// Flatten the configured tree depth-first, last-declared node first at every level.
///
/// Without layer groups, every leaf attaches to the explorer root and no
/// group items are produced.
pub fn resolve_layer_tree(nodes: &[LayerNode], use_layer_groups: bool) -> Vec<TreeItem> {
    let root = ParentRef {
        id: ROOT_EXPLORER_ID.to_string(),
        name: ROOT_EXPLORER_NAME.to_string(),
    };
    let mut out = Vec::new();
    let mut stack: Vec<(&LayerNode, ParentRef)> =
        nodes.iter().map(|node| (node, root.clone())).collect();

    while let Some((node, parent)) = stack.pop() {
        match node {
            LayerNode::Group(group) => {
                let child_parent = if use_layer_groups {
                    out.push(TreeItem::Group(ResolvedGroup {
                        id: group.id.clone(),
                        name: group.name.clone(),
                        parent_id: parent.id.clone(),
                        dont_add_to_layer_explorer: group.dont_add_to_layer_explorer,
                        classes: group.classes.clone(),
                        style: group.style.clone(),
                    }));
                    ParentRef {
                        id: group.id.clone(),
                        name: group.name.clone(),
                    }
                } else {
                    parent
                };
                stack.extend(
                    group
                        .children
                        .iter()
                        .map(|child| (child, child_parent.clone())),
                );
            }
            LayerNode::Leaf(config) => {
                out.push(TreeItem::Leaf(Layer::new(config.clone(), parent)));
            }
        }
    }

    out
}

/// Counts reported by [`LayerRegistry::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub groups: usize,
    pub added: usize,
    pub not_added: usize,
    pub rejected: usize,
}

/// Result of a layer-time refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerTimeUpdate {
    pub time: String,
    pub name: String,
    /// `true` when today's image was not yet available and the previous day was used.
    pub used_previous_day: bool,
}

/// Registry of added and not-added layers plus the visible-layer entries.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    options: RegistryOptions,
    layers: Vec<Layer>,
    not_added: Vec<Layer>,
    visible: Vec<VisibleLayerEntry>,
    events: EventSink,
}

fn tiled_source_params(params: &TiledImageryParams, time: Option<&str>) -> SourceParams {
    let mut source = SourceParams::new();
    if let (Some(time), Some(keys)) = (time, params.time_params.as_ref()) {
        match parse_date(time, "YYYY-MM-DD") {
            Some(date) => {
                source.insert(keys.year.clone(), format_date(date, "YYYY"));
                source.insert(keys.month.clone(), format_date(date, "MM"));
                source.insert(keys.day.clone(), format_date(date, "DD"));
            }
            None => tracing::warn!(time, "layer time is not a YYYY-MM-DD date"),
        }
    }
    if let Some(styles) = &params.styles {
        source.insert("STYLES".to_string(), styles.clone());
    }
    source
}

fn parent_path(explorer: &dyn LayerExplorer, layer_id: &str) -> String {
    explorer
        .parent_names(layer_id)
        .into_iter()
        .map(|name| format!("{} > ", name))
        .collect()
}

impl LayerRegistry {
    pub fn new(options: RegistryOptions, events: EventSink) -> Self {
        Self {
            options,
            events,
            ..Self::default()
        }
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    /// Deep copy of the added layers.
    pub fn layers(&self) -> Vec<Layer> {
        self.layers.clone()
    }

    pub fn not_added_layers(&self) -> &[Layer] {
        &self.not_added
    }

    pub fn visible_layers(&self) -> &[VisibleLayerEntry] {
        &self.visible
    }

    pub fn layer(&self, layer_id: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == layer_id)
    }

    pub fn is_added(&self, layer_id: &str) -> bool {
        self.layer(layer_id).is_some()
    }

    /// Added layers the user may remove; empty when removal is disabled.
    pub fn removable_layer_ids(&self) -> Vec<&str> {
        if !self.options.enable_add_and_remove_layers {
            return Vec::new();
        }
        self.layers.iter().map(Layer::id).collect()
    }

    /// Bulk initial load of the configured tree.
    ///
    /// Layers flagged `AddsInTheStart` are rendered; the rest, and any the
    /// widget refuses, go to the not-added list. No `ApplyFilter` event is
    /// emitted during this load.
    pub fn load(
        &mut self,
        nodes: &[LayerNode],
        map: &mut dyn MapWidget,
        explorer: &mut dyn LayerExplorer,
        today: NaiveDate,
    ) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut pending = PendingEvents::default();

        for item in resolve_layer_tree(nodes, self.options.use_layer_groups) {
            match item {
                TreeItem::Group(group) => {
                    summary.groups += 1;
                    if map.add_layer_group(&group.id, &group.name, &group.parent_id)
                        && !group.dont_add_to_layer_explorer
                    {
                        explorer.add_node(ExplorerNode {
                            id: &group.id,
                            name: &group.name,
                            parent_id: &group.parent_id,
                            is_group: true,
                            append_at_the_end: false,
                            classes: group.classes.as_ref(),
                            style: group.style.as_ref(),
                        });
                    }
                }
                TreeItem::Leaf(layer) if layer.config.adds_in_the_start => {
                    match self.register(layer, map, explorer, today, true, &mut pending) {
                        Ok(()) => summary.added += 1,
                        Err(layer) => {
                            tracing::warn!(layer_id = layer.id(), "map widget refused layer at startup");
                            summary.rejected += 1;
                            self.not_added.push(layer);
                        }
                    }
                }
                TreeItem::Leaf(layer) => {
                    summary.not_added += 1;
                    self.not_added.push(layer);
                }
            }
        }

        tracing::info!(
            groups = summary.groups,
            added = summary.added,
            not_added = summary.not_added,
            rejected = summary.rejected,
            "layer tree loaded"
        );
        pending.flush(&self.events);
        summary
    }

    /// Move a not-added layer onto the map.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when `layer_id` is not in the not-added list,
    /// [`AppError::LayerRejected`] when the widget refuses it; the layer then
    /// stays not-added.
    pub fn add_layer(
        &mut self,
        layer_id: &str,
        map: &mut dyn MapWidget,
        explorer: &mut dyn LayerExplorer,
        today: NaiveDate,
    ) -> Result<(), AppError> {
        let index = self
            .not_added
            .iter()
            .position(|layer| layer.id() == layer_id)
            .ok_or_else(|| AppError::NotFound(format!("layer '{}' is not available to add", layer_id)))?;
        let layer = self.not_added.remove(index);

        let mut pending = PendingEvents::default();
        match self.register(layer, map, explorer, today, false, &mut pending) {
            Ok(()) => {
                tracing::info!(layer_id, "layer added");
                pending.flush(&self.events);
                Ok(())
            }
            Err(layer) => {
                self.not_added.insert(index, layer);
                Err(AppError::LayerRejected(layer_id.to_string()))
            }
        }
    }

    /// Render `layer`, mirror it in the explorer and record it as added.
    ///
    /// Hands the layer back when the widget refuses it.
    fn register(
        &mut self,
        mut layer: Layer,
        map: &mut dyn MapWidget,
        explorer: &mut dyn LayerExplorer,
        today: NaiveDate,
        initial: bool,
        pending: &mut PendingEvents,
    ) -> Result<(), Layer> {
        let config = &layer.config;
        let descriptor = LayerDescriptor {
            id: &config.id,
            name: process_string_with_date_pattern(&config.name, today),
            title: process_string_with_date_pattern(&config.title, today),
            visible: config.visible,
            disabled: config.disabled,
            parent_id: &layer.parent.id,
            append_at_the_end: config.append_at_the_end,
            time: config
                .time()
                .map(|time| process_string_with_date_pattern(time, today)),
            resolution: config.resolution,
        };

        let accepted = match &config.kind {
            LayerKind::TiledImagery(params) => {
                let source = tiled_source_params(params, descriptor.time.as_deref());
                map.add_tile_layer(&descriptor, params, &source)
            }
            LayerKind::TileMatrixImagery(params) => map.add_wmts_layer(&descriptor, params),
            LayerKind::CustomRendered(params) => map.add_custom_layer(&descriptor, params),
        };
        if !accepted {
            return Err(layer);
        }

        if !config.dont_add_to_layer_explorer {
            explorer.add_node(ExplorerNode {
                id: &config.id,
                name: &descriptor.name,
                parent_id: &layer.parent.id,
                is_group: false,
                append_at_the_end: config.append_at_the_end,
                classes: config.classes.as_ref(),
                style: config.style.as_ref(),
            });
        }

        if config.visible {
            let entry = VisibleLayerEntry {
                layer_id: config.id.clone(),
                layer_name: descriptor.name.clone(),
                layer_title: descriptor.title.clone(),
                parent_id: layer.parent.id.clone(),
                parent_name: parent_path(explorer, &config.id),
                element_id: config.element_id(),
            };
            self.push_visible(entry, pending);
        }

        let current_time = descriptor.time.clone();
        layer.current_time = current_time;
        self.layers.push(layer);
        if !initial {
            pending.push(DashboardEvent::ApplyFilter);
        }
        Ok(())
    }

    fn push_visible(&mut self, entry: VisibleLayerEntry, pending: &mut PendingEvents) {
        if self.visible.iter().any(|e| e.layer_id == entry.layer_id) {
            return;
        }
        self.visible.push(entry);
        pending.push(DashboardEvent::UpdateMapInformationsBox);
    }

    fn drop_visible(&mut self, layer_id: &str, pending: &mut PendingEvents) {
        let before = self.visible.len();
        self.visible.retain(|entry| entry.layer_id != layer_id);
        if self.visible.len() != before {
            pending.push(DashboardEvent::UpdateMapInformationsBox);
        }
    }

    fn visible_entry_for(&self, layer: &Layer, explorer: &dyn LayerExplorer, today: NaiveDate) -> VisibleLayerEntry {
        VisibleLayerEntry {
            layer_id: layer.config.id.clone(),
            layer_name: process_string_with_date_pattern(&layer.config.name, today),
            layer_title: process_string_with_date_pattern(&layer.config.title, today),
            parent_id: layer.parent.id.clone(),
            parent_name: parent_path(explorer, layer.id()),
            element_id: element_id_for(layer.id()),
        }
    }

    /// Take an added layer off the map and return it to the not-added list.
    ///
    /// Returns `false`, changing nothing, when `layer_id` is not added or the
    /// map refuses to remove it.
    pub fn remove_layer(
        &mut self,
        layer_id: &str,
        map: &mut dyn MapWidget,
        explorer: &mut dyn LayerExplorer,
    ) -> bool {
        let Some(index) = self.layers.iter().position(|layer| layer.id() == layer_id) else {
            tracing::debug!(layer_id, "remove ignored: layer is not added");
            return false;
        };
        if !map.remove_layer(layer_id) {
            tracing::warn!(layer_id, "map refused to remove layer; keeping it added");
            return false;
        }
        let layer = self.layers.remove(index);
        let parent = self
            .options
            .use_layer_groups
            .then_some(layer.parent.id.as_str());
        explorer.remove_node(layer_id, parent);

        let mut pending = PendingEvents::default();
        self.drop_visible(layer_id, &mut pending);
        self.not_added.push(layer);
        tracing::info!(layer_id, "layer removed");
        pending.flush(&self.events);
        true
    }

    /// Toggle an added layer, keeping widget visibility and visible entries in step.
    ///
    /// Turning a background layer on turns every other background layer off.
    pub fn set_layer_visibility(
        &mut self,
        layer_id: &str,
        visible: bool,
        map: &mut dyn MapWidget,
        explorer: &dyn LayerExplorer,
        today: NaiveDate,
    ) -> Result<(), AppError> {
        let layer = self
            .layer(layer_id)
            .ok_or_else(|| AppError::NotFound(format!("layer '{}' is not added", layer_id)))?;

        if visible && layer.config.background {
            self.set_background_visibility(layer_id, map, explorer, today);
            return Ok(());
        }

        let entry = visible.then(|| self.visible_entry_for(layer, explorer, today));
        let mut pending = PendingEvents::default();
        map.set_layer_visibility(layer_id, visible);
        match entry {
            Some(entry) => self.push_visible(entry, &mut pending),
            None => self.drop_visible(layer_id, &mut pending),
        }
        pending.flush(&self.events);
        Ok(())
    }

    /// Make `selected_id` the only visible background layer.
    ///
    /// Returns `false` and changes nothing when `selected_id` is not an added
    /// background layer.
    pub fn set_background_visibility(
        &mut self,
        selected_id: &str,
        map: &mut dyn MapWidget,
        explorer: &dyn LayerExplorer,
        today: NaiveDate,
    ) -> bool {
        let Some(selected) = self
            .layers
            .iter()
            .find(|layer| layer.config.background && layer.id() == selected_id)
        else {
            return false;
        };
        let selected_entry = self.visible_entry_for(selected, explorer, today);

        let others: Vec<String> = self
            .layers
            .iter()
            .filter(|layer| layer.config.background && layer.id() != selected_id)
            .map(|layer| layer.id().to_string())
            .collect();

        let mut pending = PendingEvents::default();
        for other in &others {
            let listed = self.visible.iter().any(|entry| &entry.layer_id == other);
            if map.is_layer_visible(other) || listed {
                map.set_layer_visibility(other, false);
                self.drop_visible(other, &mut pending);
            }
        }
        map.set_layer_visibility(selected_id, true);
        self.push_visible(selected_entry, &mut pending);

        tracing::debug!(selected_id, "background layer selected");
        pending.flush(&self.events);
        true
    }

    /// Re-resolve the time of an added layer and push it to the widget.
    ///
    /// When the layer sets `MinTimeForTodaysImage` and `now` is not past that
    /// cutoff on the day the pattern resolves to, the previous day is used.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when the layer is not added,
    /// [`AppError::InvalidConfig`] when it has no time or the time does not
    /// parse with its own format.
    pub fn update_layer_time(
        &mut self,
        layer_id: &str,
        map: &mut dyn MapWidget,
        now: NaiveDateTime,
    ) -> Result<LayerTimeUpdate, AppError> {
        let index = self
            .layers
            .iter()
            .position(|layer| layer.id() == layer_id)
            .ok_or_else(|| AppError::NotFound(format!("layer '{}' is not added", layer_id)))?;
        let config = &self.layers[index].config;
        let pattern = config.time().ok_or_else(|| {
            AppError::invalid_config(format!("layer '{}' has no time parameter", layer_id))
        })?;

        let today = now.date();
        let format = format_from_string_with_date_pattern(pattern)
            .unwrap_or_else(|| "YYYY-MM-DD".to_string());
        let resolved = process_string_with_date_pattern(pattern, today);

        let use_todays_image = match config.min_time_for_todays_image {
            Some(cutoff) if resolved == format_date(today, &format) => now.time() > cutoff,
            _ => true,
        };

        let (time, name) = if use_todays_image {
            (resolved, process_string_with_date_pattern(&config.name, today))
        } else {
            let date = parse_date(&resolved, &format)
                .and_then(|date| date.pred_opt())
                .ok_or_else(|| {
                    AppError::invalid_config(format!(
                        "layer '{}' time '{}' does not match format '{}'",
                        layer_id, resolved, format
                    ))
                })?;
            (
                format_date(date, &format),
                replace_date_pattern_with_string(&config.name, &format_date(date, "YYYY/MM/DD")),
            )
        };

        match &config.kind {
            LayerKind::TileMatrixImagery(params) => map.update_layer_time(layer_id, &time, Some(params)),
            LayerKind::TiledImagery(params) => {
                map.update_layer_time(layer_id, &time, None);
                if params.time_params.is_some() {
                    let reformatted = parse_date(&time, &format)
                        .map(|date| format_date(date, "YYYY-MM-DD"))
                        .unwrap_or_else(|| time.clone());
                    let mut source = tiled_source_params(params, Some(&reformatted));
                    source.remove("STYLES");
                    map.update_layer_source_params(layer_id, &source);
                }
            }
            LayerKind::CustomRendered(_) => map.update_layer_time(layer_id, &time, None),
        }
        map.update_layer_name(layer_id, &name);

        self.layers[index].current_time = Some(time.clone());
        let mut pending = PendingEvents::default();
        if let Some(entry) = self.visible.iter_mut().find(|e| e.layer_id == layer_id) {
            if entry.layer_name != name {
                entry.layer_name = name.clone();
                pending.push(DashboardEvent::UpdateMapInformationsBox);
            }
        }
        pending.flush(&self.events);

        tracing::debug!(layer_id, time = %time, used_previous_day = !use_todays_image, "layer time updated");
        Ok(LayerTimeUpdate {
            time,
            name,
            used_previous_day: !use_todays_image,
        })
    }
}

#[cfg(test)]
mod tests;
