//! Shared constants used across Queimadas crates.

/// Default base URL of the dashboard backend API.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000/";

/// Default request timeout for backend calls, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Id of the layer-explorer root node that ungrouped layers attach to.
pub const ROOT_EXPLORER_ID: &str = "terrama2-layerexplorer";
/// Display name of the layer-explorer root node.
pub const ROOT_EXPLORER_NAME: &str = "Main layers";

/// Date format used by the date filter inputs.
pub const FILTER_DATE_FORMAT: &str = "YYYY/MM/DD";
/// Date/time format used when displaying feature attributes.
pub const FEATURE_DATE_TIME_FORMAT: &str = "YYYY/MM/DD HH:II:SS";

/// Request id the backend proxy echoes for feature-info lookups.
pub const FEATURE_INFO_REQUEST_ID: &str = "GetFeatureInfoTool";
/// Maximum number of features requested per feature-info click.
pub const FEATURE_INFO_FEATURE_COUNT: u32 = 30;

/// Graphic id that is hidden when it only has a single row.
pub const FIRES_BY_COUNTRY_GRAPHIC_ID: &str = "firesByCountry";
/// Label used for chart rows whose template field is empty.
pub const UNIDENTIFIED_LABEL: &str = "Not identified";
/// Message shown inside a graphic panel without data.
pub const NO_GRAPHIC_DATA_MESSAGE: &str = "There is no data to display!";

/// Base height of a fires-count chart, in pixels.
pub const CHART_BASE_HEIGHT_PX: u32 = 100;
/// Height added per chart row, in pixels.
pub const CHART_ROW_HEIGHT_PX: u32 = 20;

/// Fill color of fires-count bars.
pub const CHART_BACKGROUND_COLOR: &str = "rgba(220,75,56,0.5)";
/// Border color of fires-count bars.
pub const CHART_BORDER_COLOR: &str = "rgba(220,75,56,0.8)";
/// Fill color of hovered fires-count bars.
pub const CHART_HOVER_BACKGROUND_COLOR: &str = "rgba(220,75,56,0.75)";
/// Border color of hovered fires-count bars.
pub const CHART_HOVER_BORDER_COLOR: &str = "rgba(220,75,56,1)";
