//! Fires-count graphics board: panel ordering, requests and chart assembly.

use crate::constants::{
    CHART_BACKGROUND_COLOR, CHART_BASE_HEIGHT_PX, CHART_BORDER_COLOR,
    CHART_HOVER_BACKGROUND_COLOR, CHART_HOVER_BORDER_COLOR, CHART_ROW_HEIGHT_PX,
    FILTER_DATE_FORMAT, FIRES_BY_COUNTRY_GRAPHIC_ID, NO_GRAPHIC_DATA_MESSAGE, UNIDENTIFIED_LABEL,
};
use crate::events::{DashboardEvent, EventSink};
use crate::filter::{Filter, FilterEpoch};
use crate::models::graphic::{row_count_value, FiresCountResponse, FilterRules, GraphicConfig};
use crate::AppError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Spatial and attribute parameters shared by count and export requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicsScope {
    pub date_time_from: String,
    pub date_time_to: String,
    pub satellites: String,
    pub biomes: String,
    pub countries: String,
    pub states: String,
    pub cities: String,
}

impl GraphicsScope {
    /// Query values for `filter`, with dates in the backend's format.
    pub fn from_filter(filter: &Filter, fires_date_format: &str) -> Self {
        let (date_time_from, date_time_to) = filter.fires_date_time_range(fires_date_format);
        Self {
            date_time_from,
            date_time_to,
            satellites: filter.satellites_query(),
            biomes: filter.biomes.to_query_value(),
            countries: filter.countries.to_query_value(),
            states: filter.states.to_query_value(),
            cities: filter.city.clone().unwrap_or_default(),
        }
    }

    fn push_pairs(&self, pairs: &mut Vec<(String, String)>) {
        for (key, value) in [
            ("dateTimeFrom", &self.date_time_from),
            ("dateTimeTo", &self.date_time_to),
            ("satellites", &self.satellites),
            ("biomes", &self.biomes),
            ("countries", &self.countries),
            ("states", &self.states),
            ("cities", &self.cities),
        ] {
            pairs.push((key.to_string(), value.clone()));
        }
    }
}

/// One `GET /graphicsfirescount` request, tagged with the filter it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiresCountQuery {
    pub epoch: FilterEpoch,
    pub id: String,
    pub y: String,
    pub key: String,
    pub limit: Option<u32>,
    pub title: String,
    pub scope: GraphicsScope,
    pub filter_rules: FilterRules,
}

impl FiresCountQuery {
    /// Query-string pairs; filter rules use bracketed keys (`filterRules[ignoreCountryFilter]`).
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(20);
        self.scope.push_pairs(&mut pairs);
        pairs.push(("id".to_string(), self.id.clone()));
        pairs.push(("y".to_string(), self.y.clone()));
        pairs.push(("key".to_string(), self.key.clone()));
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs.push(("title".to_string(), self.title.clone()));

        let rules = &self.filter_rules;
        for (name, value) in [
            ("ignoreCountryFilter", rules.ignore_country_filter),
            ("ignoreStateFilter", rules.ignore_state_filter),
            ("ignoreCityFilter", rules.ignore_city_filter),
            ("showOnlyIfThereIsACountryFiltered", rules.show_only_if_there_is_a_country_filtered),
            ("showOnlyIfThereIsNoCountryFiltered", rules.show_only_if_there_is_no_country_filtered),
            ("showOnlyIfThereIsAStateFiltered", rules.show_only_if_there_is_a_state_filtered),
            ("showOnlyIfThereIsNoStateFiltered", rules.show_only_if_there_is_no_state_filtered),
        ] {
            pairs.push((format!("filterRules[{}]", name), value.to_string()));
        }
        pairs
    }
}

/// Parameters of a `GET /export-graphic-data` download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportQuery {
    pub id: String,
    pub scope: GraphicsScope,
}

impl ExportQuery {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(8);
        self.scope.push_pairs(&mut pairs);
        pairs.push(("id".to_string(), self.id.clone()));
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub background_color: &'static str,
    pub border_color: &'static str,
    pub hover_background_color: &'static str,
    pub hover_border_color: &'static str,
    pub data: Vec<f64>,
}

/// Horizontal bar chart of one graphic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelContent {
    Loading,
    Chart(ChartData),
    Message { text: String },
}

/// A graphic panel on the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphicPanel {
    pub id: String,
    pub title: String,
    pub order: i64,
    pub expanded: bool,
    /// Suffix of the title: `" | N fires, from A to B"`.
    pub additional_title: String,
    pub visible: bool,
    pub content: PanelContent,
}

impl GraphicPanel {
    pub fn full_title(&self) -> String {
        format!("{}{}", self.title, self.additional_title)
    }
}

/// Field names referenced as `{field}` in a label template.
fn template_fields(template: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let field = &after[..end];
        if !field.is_empty() && !field.contains('{') {
            fields.push(field);
        }
        rest = &after[end + 1..];
    }
    fields
}

fn display_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Render a label template against one result row.
pub fn render_label(template: &str, row: &Map<String, Value>) -> String {
    let mut label = template.to_string();
    for field in template_fields(template) {
        let value = display_value(row.get(field)).unwrap_or_else(|| UNIDENTIFIED_LABEL.to_string());
        label = label.replacen(&format!("{{{}}}", field), &value, 1);
    }
    label
}

fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Share of `total` as a one-decimal percentage; `0.0` when `total` is zero.
pub fn percentage(count: f64, total: f64) -> String {
    if total == 0.0 {
        return "0.0".to_string();
    }
    format!("{:.1}", count / total * 100.0)
}

/// Chart for a fires-count response.
pub fn build_chart(response: &FiresCountResponse) -> ChartData {
    let total = response.total_count();
    let mut labels = Vec::with_capacity(response.fires_count.rows.len());
    let mut data = Vec::with_capacity(response.fires_count.rows.len());

    for row in &response.fires_count.rows {
        let count = row_count_value(row).unwrap_or(0.0);
        labels.push(format!(
            "{} ({} F | {}%)",
            render_label(&response.y, row),
            format_count(count),
            percentage(count, total)
        ));
        data.push(count);
    }

    let rows = u32::try_from(response.fires_count.row_count).unwrap_or(u32::MAX);
    ChartData {
        labels,
        datasets: vec![ChartDataset {
            background_color: CHART_BACKGROUND_COLOR,
            border_color: CHART_BORDER_COLOR,
            hover_background_color: CHART_HOVER_BACKGROUND_COLOR,
            hover_border_color: CHART_HOVER_BORDER_COLOR,
            data,
        }],
        height_px: rows
            .saturating_mul(CHART_ROW_HEIGHT_PX)
            .saturating_add(CHART_BASE_HEIGHT_PX),
    }
}

/// Ordered graphic panels plus the in-flight request bookkeeping.
#[derive(Debug, Clone)]
pub struct GraphicsBoard {
    configs: Vec<GraphicConfig>,
    panels: Vec<GraphicPanel>,
    loading: usize,
    epoch: FilterEpoch,
    scope: Option<GraphicsScope>,
    date_labels: (String, String),
    events: EventSink,
}

impl GraphicsBoard {
    pub fn new(configs: Vec<GraphicConfig>, events: EventSink) -> Self {
        Self {
            configs,
            panels: Vec::new(),
            loading: 0,
            epoch: FilterEpoch::default(),
            scope: None,
            date_labels: (String::new(), String::new()),
            events,
        }
    }

    /// Panels in display order.
    pub fn panels(&self) -> &[GraphicPanel] {
        &self.panels
    }

    pub fn panel(&self, id: &str) -> Option<&GraphicPanel> {
        self.panels.iter().find(|panel| panel.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading > 0
    }

    pub fn loading_count(&self) -> usize {
        self.loading
    }

    /// `true` when no panel is visible.
    pub fn no_data(&self) -> bool {
        !self.panels.iter().any(|panel| panel.visible)
    }

    fn empty_title(&self) -> String {
        format!(" | 0 fires, from {} to {}", self.date_labels.0, self.date_labels.1)
    }

    /// Start a refresh for `filter` and return the requests to send.
    ///
    /// Graphics whose show-only rules exclude the current spatial filter are
    /// hidden and not requested. Missing panels are created at their ordered
    /// position.
    pub fn update_graphics(
        &mut self,
        filter: &Filter,
        epoch: FilterEpoch,
        fires_date_format: &str,
    ) -> Vec<FiresCountQuery> {
        let scope = GraphicsScope::from_filter(filter, fires_date_format);
        self.epoch = epoch;
        self.date_labels = filter.dates.formatted(FILTER_DATE_FORMAT);

        let mut queries = Vec::new();
        for config in self.configs.clone() {
            let rules = config.filter_rules();
            if rules.hides_for(&scope.countries, &scope.states) {
                self.hide_graphic(&config.id);
                continue;
            }

            if self.panel(&config.id).is_none() {
                let panel = GraphicPanel {
                    id: config.id.clone(),
                    title: config.title.clone(),
                    order: config.order,
                    expanded: config.expanded,
                    additional_title: self.empty_title(),
                    visible: false,
                    content: PanelContent::Loading,
                };
                self.insert_graphic_at_position(panel);
            }

            self.loading += 1;
            queries.push(FiresCountQuery {
                epoch,
                id: config.id.clone(),
                y: config.y.clone(),
                key: config.key.clone(),
                limit: config.limit,
                title: config.title.clone(),
                scope: scope.clone(),
                filter_rules: rules,
            });
        }

        tracing::debug!(
            epoch = epoch.0,
            requested = queries.len(),
            loading = self.loading,
            "graphics refresh started"
        );
        self.scope = Some(scope);
        self.events.emit(DashboardEvent::GraphicsChanged);
        queries
    }

    /// Insert keeping panels sorted by `order`; equal orders keep insertion order.
    pub fn insert_graphic_at_position(&mut self, panel: GraphicPanel) {
        let index = self
            .panels
            .iter()
            .position(|existing| existing.order > panel.order)
            .unwrap_or(self.panels.len());
        self.panels.insert(index, panel);
    }

    /// Apply a fires-count response.
    ///
    /// Returns `false` when the response belongs to an older filter or to an
    /// unknown graphic; the loading counter is decremented either way.
    pub fn load_fires_count(&mut self, epoch: FilterEpoch, response: &FiresCountResponse) -> bool {
        self.loading = self.loading.saturating_sub(1);
        if epoch != self.epoch {
            tracing::debug!(
                graphic = %response.id,
                stale = epoch.0,
                current = self.epoch.0,
                "discarding stale fires count"
            );
            return false;
        }

        let chart = build_chart(response);
        let total: f64 = chart.datasets[0].data.iter().sum();
        let additional_title = format!(
            " | {} fires, from {} to {}",
            format_count(total),
            self.date_labels.0,
            self.date_labels.1
        );
        let Some(panel) = self.panels.iter_mut().find(|panel| panel.id == response.id) else {
            tracing::warn!(graphic = %response.id, "fires count for unknown graphic");
            return false;
        };
        panel.additional_title = additional_title;
        panel.content = PanelContent::Chart(chart);
        panel.visible = true;

        let (countries, states) = self
            .scope
            .as_ref()
            .map(|scope| (scope.countries.as_str(), scope.states.as_str()))
            .unwrap_or(("", ""));
        let single_country =
            response.fires_count.row_count <= 1 && response.id == FIRES_BY_COUNTRY_GRAPHIC_ID;
        if single_country || response.filter_rules.hides_for(countries, states) {
            let id = response.id.clone();
            self.hide_graphic(&id);
        }

        self.events.emit(DashboardEvent::GraphicsChanged);
        true
    }

    /// Settle a fires-count request that failed.
    ///
    /// Returns `true` when it belonged to the current filter; its panel is then hidden.
    pub fn request_failed(&mut self, epoch: FilterEpoch, graphic_id: &str) -> bool {
        self.loading = self.loading.saturating_sub(1);
        if epoch != self.epoch {
            return false;
        }
        self.hide_graphic(graphic_id);
        self.events.emit(DashboardEvent::GraphicsChanged);
        true
    }

    /// Hide a panel and show the "no data" message in it.
    pub fn hide_graphic(&mut self, id: &str) {
        let empty_title = self.empty_title();
        if let Some(panel) = self.panels.iter_mut().find(|panel| panel.id == id) {
            panel.additional_title = empty_title;
            panel.content = PanelContent::Message {
                text: NO_GRAPHIC_DATA_MESSAGE.to_string(),
            };
            panel.visible = false;
        }
    }

    /// Export parameters for graphic `id` under the filter of the last refresh.
    ///
    /// # Errors
    /// [`AppError::NotFound`] for an unconfigured graphic or before any refresh.
    pub fn export_query(&self, id: &str) -> Result<ExportQuery, AppError> {
        if !self.configs.iter().any(|config| config.id == id) {
            return Err(AppError::NotFound(format!("graphic '{}'", id)));
        }
        let scope = self
            .scope
            .clone()
            .ok_or_else(|| AppError::NotFound("graphics have not been loaded yet".to_string()))?;
        Ok(ExportQuery {
            id: id.to_string(),
            scope,
        })
    }
}
