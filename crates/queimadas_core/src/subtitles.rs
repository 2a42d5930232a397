//! Legend (subtitle) visibility derived from layer, resolution and satellite state.
//!
//! Nothing here is toggled directly: a legend group is displayed when one of
//! its layers is drawable on the map, and satellite rows are shown for the
//! satellites active in the filtered date window. Both inputs are re-derived
//! on every call, so repeated calls with the same inputs give the same legend.

use crate::events::{DashboardEvent, EventSink};
use crate::filter::Filter;
use crate::models::satellite::SatelliteConfig;
use crate::models::subtitle::SubtitleConfig;
use crate::widget::MapWidget;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone)]
struct GroupState {
    config: SubtitleConfig,
    satellite: bool,
    layer_visible: bool,
    rows_visible: Vec<bool>,
}

impl GroupState {
    fn displayed(&self) -> bool {
        self.layer_visible && (!self.satellite || self.rows_visible.iter().any(|shown| *shown))
    }
}

/// One legend row as it should be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendRow {
    pub subtitle_id: Option<String>,
    pub text: String,
    pub style: String,
    pub visible: bool,
}

/// One legend group as it should be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendGroup {
    pub id: String,
    pub layer_name: String,
    pub satellite: bool,
    pub visible: bool,
    pub rows: Vec<LegendRow>,
}

/// Full legend state, including the "no legends" indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendSnapshot {
    pub groups: Vec<LegendGroup>,
    pub no_legends: bool,
}

/// Satellites whose operational window intersects the filter dates, sorted by id.
pub fn active_satellites(
    filter: &Filter,
    satellites: &[SatelliteConfig],
    today: NaiveDate,
) -> Vec<String> {
    let mut ids: Vec<String> = satellites
        .iter()
        .filter(|satellite| satellite.is_active_between(filter.dates.from, filter.dates.to, today))
        .map(|satellite| satellite.id.clone())
        .collect();
    ids.sort();
    ids
}

/// Derives which legend groups and rows are displayed.
#[derive(Debug, Clone)]
pub struct SubtitleEngine {
    groups: Vec<GroupState>,
    base_url: String,
    events: EventSink,
}

impl SubtitleEngine {
    /// Build the legend from configuration.
    ///
    /// Groups referencing `satellite_layer_id` hold satellite rows, which start
    /// hidden until [`SubtitleEngine::update_subtitles`] selects them.
    pub fn new(
        subtitles: &[SubtitleConfig],
        satellite_layer_id: &str,
        base_url: &str,
        events: EventSink,
    ) -> Self {
        let groups = subtitles
            .iter()
            .map(|config| {
                let satellite =
                    !satellite_layer_id.is_empty() && config.references_layer(satellite_layer_id);
                GroupState {
                    rows_visible: config
                        .items
                        .iter()
                        .map(|_| !satellite)
                        .collect(),
                    config: config.clone(),
                    satellite,
                    layer_visible: false,
                }
            })
            .collect();
        Self {
            groups,
            base_url: base_url.to_string(),
            events,
        }
    }

    /// Recompute group visibility from the map widget.
    ///
    /// With `layer_id`, only groups referencing that layer are recomputed;
    /// a group is shown when any of its layers is visible at the current
    /// resolution.
    pub fn set_subtitles_visibility(&mut self, layer_id: Option<&str>, map: &dyn MapWidget) {
        let before = self.visible_subtitle_ids_owned();
        for group in &mut self.groups {
            if layer_id.is_some_and(|id| !group.config.references_layer(id)) {
                continue;
            }
            group.layer_visible = group.config.layer_ids.iter().any(|id| {
                map.is_resolution_valid_for_layer(id) && map.is_layer_visible(id)
            });
        }
        self.notify_if_changed(before);
    }

    /// Select the satellite rows for the filter's date window.
    ///
    /// Returns the satellites now shown.
    pub fn get_subtitles_satellites(
        &mut self,
        filter: &Filter,
        satellites: &[SatelliteConfig],
        today: NaiveDate,
    ) -> Vec<String> {
        let active = active_satellites(filter, satellites, today);
        tracing::debug!(count = active.len(), "satellites active in filter window");
        self.update_subtitles(&active);
        active
    }

    /// Show exactly the satellite rows whose id is in `satellites`.
    ///
    /// An empty list hides every satellite group; rows without an id stay hidden.
    pub fn update_subtitles(&mut self, satellites: &[String]) {
        let before = self.snapshot();
        for group in self.groups.iter_mut().filter(|group| group.satellite) {
            for (item, shown) in group.config.items.iter().zip(group.rows_visible.iter_mut()) {
                *shown = item
                    .subtitle_id
                    .as_ref()
                    .is_some_and(|id| satellites.contains(id));
            }
        }
        if self.snapshot() != before {
            self.events.emit(DashboardEvent::LegendChanged);
        }
    }

    /// `true` when no legend group is displayed.
    pub fn no_legends(&self) -> bool {
        !self.groups.iter().any(GroupState::displayed)
    }

    /// Ids of the displayed legend groups, in configuration order.
    pub fn visible_subtitle_ids(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|group| group.displayed())
            .map(|group| group.config.id.as_str())
            .collect()
    }

    fn visible_subtitle_ids_owned(&self) -> Vec<String> {
        self.visible_subtitle_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn notify_if_changed(&self, before: Vec<String>) {
        if self.visible_subtitle_ids() != before {
            self.events.emit(DashboardEvent::LegendChanged);
        }
    }

    pub fn snapshot(&self) -> LegendSnapshot {
        LegendSnapshot {
            groups: self
                .groups
                .iter()
                .map(|group| LegendGroup {
                    id: group.config.id.clone(),
                    layer_name: group.config.layer_name.clone(),
                    satellite: group.satellite,
                    visible: group.displayed(),
                    rows: group
                        .config
                        .items
                        .iter()
                        .zip(&group.rows_visible)
                        .map(|(item, shown)| LegendRow {
                            subtitle_id: item.subtitle_id.clone(),
                            text: item.text.clone(),
                            style: item.swatch_style(&self.base_url),
                            visible: *shown,
                        })
                        .collect(),
                })
                .collect(),
            no_legends: self.no_legends(),
        }
    }
}
