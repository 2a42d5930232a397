//! Root crate facade for the Queimadas dashboard core and backend client.

pub use queimadas_client::{spawn_backend, ApiClient, BackendHandle, ClientError};
pub use queimadas_core::{
    config, constants, dashboard, date_pattern, error, events, feature_info, filter, graphics,
    models, protocol, registry, settings, subtitles, widget, AppError, Config, Configurations,
    Dashboard, DashboardEvent, EventSink, FetchCmd, FetchEvent, FetchSource, Filter, FilterEpoch,
    FilterError, FilterInput, LayerRegistry, SubtitleEngine,
};
