//! Dashboard context tying the registry, legend and graphics to one filter.
//!
//! All mutable dashboard state lives in [`Dashboard`]; the map widget and the
//! layer explorer are borrowed per call, so ownership stays with the host.

use crate::events::{DashboardEvent, EventSink};
use crate::feature_info::{feature_info_report, feature_info_url, FeatureInfoReport};
use crate::filter::{Filter, FilterEpoch, FilterInput};
use crate::graphics::{ExportQuery, GraphicsBoard};
use crate::protocol::{FetchCmd, FetchEvent, FetchSource};
use crate::registry::{LayerRegistry, LayerTimeUpdate, LoadSummary, RegistryOptions};
use crate::settings::Configurations;
use crate::subtitles::{active_satellites, SubtitleEngine};
use crate::widget::{LayerExplorer, MapTool, MapWidget};
use crate::AppError;
use chrono::{NaiveDate, NaiveDateTime};

/// Owned dashboard state.
#[derive(Debug)]
pub struct Dashboard {
    configurations: Configurations,
    registry: LayerRegistry,
    subtitles: SubtitleEngine,
    graphics: GraphicsBoard,
    filter: Filter,
    epoch: FilterEpoch,
    active_tool: Option<MapTool>,
    feature_info: Option<FeatureInfoReport>,
    last_error: Option<String>,
    events: EventSink,
}

impl Dashboard {
    /// Build the dashboard for `configurations`.
    ///
    /// The initial filter covers `today` and selects the satellites active on
    /// that day. `base_url` prefixes legend icon paths.
    pub fn new(
        configurations: Configurations,
        base_url: &str,
        events: EventSink,
        today: NaiveDate,
    ) -> Self {
        let registry = LayerRegistry::new(
            RegistryOptions {
                use_layer_groups: configurations.map.use_layer_groups_in_the_layer_explorer,
                enable_add_and_remove_layers: configurations.map.enable_add_and_remove_layers,
            },
            events.clone(),
        );
        let subtitles = SubtitleEngine::new(
            &configurations.map.subtitles,
            &configurations.filter.layer_to_filter.layer_id,
            base_url,
            events.clone(),
        );
        let graphics = GraphicsBoard::new(configurations.graphics.clone(), events.clone());

        let mut filter = Filter::for_day(today);
        filter.initial = true;
        filter.initial_satellites =
            active_satellites(&filter, &configurations.filter.satellites, today);

        Self {
            configurations,
            registry,
            subtitles,
            graphics,
            filter,
            epoch: FilterEpoch::default(),
            active_tool: None,
            feature_info: None,
            last_error: None,
            events,
        }
    }

    pub fn configurations(&self) -> &Configurations {
        &self.configurations
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn subtitles(&self) -> &SubtitleEngine {
        &self.subtitles
    }

    pub fn graphics(&self) -> &GraphicsBoard {
        &self.graphics
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn epoch(&self) -> FilterEpoch {
        self.epoch
    }

    pub fn active_tool(&self) -> Option<MapTool> {
        self.active_tool
    }

    /// Last feature-info result, if any click produced one.
    pub fn feature_info(&self) -> Option<&FeatureInfoReport> {
        self.feature_info.as_ref()
    }

    /// User-facing message of the last failed request.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Load the layer tree, build the legend and arm the move tool.
    pub fn init(
        &mut self,
        map: &mut dyn MapWidget,
        explorer: &mut dyn LayerExplorer,
        today: NaiveDate,
    ) -> LoadSummary {
        let summary = self
            .registry
            .load(&self.configurations.map.layers, map, explorer, today);
        self.subtitles.set_subtitles_visibility(None, map);
        self.subtitles
            .get_subtitles_satellites(&self.filter, &self.configurations.filter.satellites, today);
        self.activate_move_map_tool(map);
        summary
    }

    pub fn add_layer(
        &mut self,
        layer_id: &str,
        map: &mut dyn MapWidget,
        explorer: &mut dyn LayerExplorer,
        today: NaiveDate,
    ) -> Result<(), AppError> {
        self.registry.add_layer(layer_id, map, explorer, today)?;
        self.subtitles.set_subtitles_visibility(Some(layer_id), map);
        Ok(())
    }

    pub fn remove_layer(
        &mut self,
        layer_id: &str,
        map: &mut dyn MapWidget,
        explorer: &mut dyn LayerExplorer,
    ) -> bool {
        let removed = self.registry.remove_layer(layer_id, map, explorer);
        if removed {
            self.subtitles.set_subtitles_visibility(Some(layer_id), map);
        }
        removed
    }

    /// Toggle a layer and recompute every legend, since a background switch
    /// can hide other layers.
    pub fn set_layer_visibility(
        &mut self,
        layer_id: &str,
        visible: bool,
        map: &mut dyn MapWidget,
        explorer: &dyn LayerExplorer,
        today: NaiveDate,
    ) -> Result<(), AppError> {
        self.registry
            .set_layer_visibility(layer_id, visible, map, explorer, today)?;
        self.subtitles.set_subtitles_visibility(None, map);
        Ok(())
    }

    /// Recompute legends after the map resolution changed.
    pub fn resolution_changed(&mut self, map: &dyn MapWidget) {
        self.subtitles.set_subtitles_visibility(None, map);
    }

    pub fn update_layer_time(
        &mut self,
        layer_id: &str,
        map: &mut dyn MapWidget,
        now: NaiveDateTime,
    ) -> Result<LayerTimeUpdate, AppError> {
        self.registry.update_layer_time(layer_id, map, now)
    }

    /// Validate and apply new filter values.
    ///
    /// Bumps the filter epoch, reselects satellite legend rows and returns the
    /// graphics requests for the new filter.
    ///
    /// # Errors
    /// [`AppError::Filter`] when dates or times are invalid; state is left unchanged.
    pub fn apply_filter(
        &mut self,
        input: &FilterInput,
        today: NaiveDate,
    ) -> Result<Vec<FetchCmd>, AppError> {
        let filter = Filter::from_input(input)?;
        self.filter = filter;
        self.subtitles
            .get_subtitles_satellites(&self.filter, &self.configurations.filter.satellites, today);
        tracing::info!(
            from = %self.filter.dates.from,
            to = %self.filter.dates.to,
            "filter applied"
        );
        Ok(self.refresh_graphics_with(self.filter.clone()))
    }

    /// Reload the graphics, either with the main filter or with the graphics
    /// panel's own filter values.
    ///
    /// # Errors
    /// [`AppError::Filter`] when `graphics_filter` has invalid dates or times.
    pub fn update_graphics(
        &mut self,
        graphics_filter: Option<&FilterInput>,
    ) -> Result<Vec<FetchCmd>, AppError> {
        let filter = match graphics_filter {
            Some(input) => Filter::from_input(input)?,
            None => self.filter.clone(),
        };
        Ok(self.refresh_graphics_with(filter))
    }

    fn refresh_graphics_with(&mut self, filter: Filter) -> Vec<FetchCmd> {
        self.epoch = self.epoch.next();
        self.graphics
            .update_graphics(&filter, self.epoch, &self.configurations.fires_date_format)
            .into_iter()
            .map(FetchCmd::FiresCount)
            .collect()
    }

    pub fn export_graphic_data(&self, graphic_id: &str) -> Result<ExportQuery, AppError> {
        self.graphics.export_query(graphic_id)
    }

    /// Request for a feature-info click; `widget_url` is the GetFeatureInfo URL
    /// built by the map widget.
    pub fn feature_info_command(&self, widget_url: &str) -> FetchCmd {
        FetchCmd::FeatureInfo {
            url: feature_info_url(widget_url),
        }
    }

    /// Apply a fetch-worker reply.
    ///
    /// Returns `false` when the reply was stale or carried nothing to show.
    pub fn handle_fetch_event(&mut self, event: FetchEvent) -> bool {
        match event {
            FetchEvent::FiresCount { epoch, response } => {
                self.graphics.load_fires_count(epoch, &response)
            }
            FetchEvent::FeatureInfo { response } => {
                let report =
                    feature_info_report(&response, &self.configurations.filter.layer_to_filter);
                let found = report.is_some();
                if found {
                    self.feature_info = report;
                }
                found
            }
            FetchEvent::Failed { source, message } => {
                if let FetchSource::FiresCount { epoch, graphic_id } = &source {
                    if !self.graphics.request_failed(*epoch, graphic_id) {
                        tracing::debug!(graphic = %graphic_id, "ignoring failure of stale request");
                        return false;
                    }
                }
                tracing::warn!(?source, message = %message, "backend request failed");
                self.last_error = Some(message.clone());
                self.events.emit(DashboardEvent::RequestFailed { message });
                true
            }
        }
    }

    /// Zoom to the configured continent extent.
    ///
    /// With `apply_filter`, also asks listeners to re-run the filter and
    /// refresh dependent components. Returns `false` when no extent is configured.
    pub fn initial_extent(&mut self, map: &mut dyn MapWidget, apply_filter: bool) -> bool {
        let Some(extent) = self.configurations.continent_extent else {
            return false;
        };
        map.zoom_to_extent(extent);
        if apply_filter {
            self.events.emit(DashboardEvent::ApplyFilter);
            self.events.emit(DashboardEvent::UpdateComponents);
        }
        true
    }

    /// Drop every mouse tool binding.
    pub fn reset_map_mouse_tools(&mut self, map: &mut dyn MapWidget) {
        map.unset_single_click();
        map.remove_zoom_drag_box();
        self.active_tool = None;
    }

    pub fn activate_move_map_tool(&mut self, map: &mut dyn MapWidget) {
        self.reset_map_mouse_tools(map);
        self.active_tool = Some(MapTool::Move);
    }

    pub fn activate_dragbox_tool(&mut self, map: &mut dyn MapWidget) {
        self.reset_map_mouse_tools(map);
        map.add_zoom_drag_box();
        self.active_tool = Some(MapTool::DragBox);
    }

    /// Arm feature-info clicks on the filtered layer.
    pub fn activate_feature_info_tool(&mut self, map: &mut dyn MapWidget) {
        self.reset_map_mouse_tools(map);
        map.set_feature_info_on_click(&self.configurations.filter.layer_to_filter.layer_id);
        self.active_tool = Some(MapTool::FeatureInfo);
    }
}
