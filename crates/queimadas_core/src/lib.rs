//! Core state library for the Queimadas fire dashboard (layers, legends, graphics).

/// Runtime configuration loaded from the environment.
pub mod config;
/// Default values and user-facing constants.
pub mod constants;
/// Owned dashboard context.
pub mod dashboard;
/// Date formats and date placeholders.
pub mod date_pattern;
/// Environment mutation helpers for tests.
pub mod env;
/// Application error types.
pub mod error;
/// Notifications for UI listeners.
pub mod events;
/// Fire attribute records from GetFeatureInfo responses.
pub mod feature_info;
/// Filter validation and the filter epoch.
pub mod filter;
/// Fires-count graphics board.
pub mod graphics;
/// Configuration and payload models.
pub mod models;
/// Fetch worker command/event protocol.
pub mod protocol;
/// Added/not-added/visible layer registry.
pub mod registry;
/// Dashboard configuration document.
pub mod settings;
/// Legend visibility engine.
pub mod subtitles;
/// Map widget and layer explorer capabilities.
pub mod widget;

pub use config::Config;
pub use dashboard::Dashboard;
pub use error::AppError;
pub use events::{DashboardEvent, EventSink};
pub use filter::{Filter, FilterEpoch, FilterError, FilterInput};
pub use protocol::{FetchCmd, FetchEvent, FetchSource};
pub use registry::LayerRegistry;
pub use settings::Configurations;
pub use subtitles::SubtitleEngine;
