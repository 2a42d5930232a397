//! Command/event protocol between the dashboard and the fetch worker.

use crate::filter::FilterEpoch;
use crate::graphics::FiresCountQuery;
use crate::models::feature::ProxyResponse;
use crate::models::graphic::FiresCountResponse;

/// Requests the dashboard hands to the fetch worker.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchCmd {
    /// `GET /graphicsfirescount` for one graphic.
    FiresCount(FiresCountQuery),
    /// `GET /proxy` relaying a GetFeatureInfo URL built by the map widget.
    FeatureInfo { url: String },
    /// Stop the worker after pending commands.
    Shutdown,
}

/// Which request a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    FiresCount { epoch: FilterEpoch, graphic_id: String },
    FeatureInfo,
}

/// Replies produced by the fetch worker.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    FiresCount {
        epoch: FilterEpoch,
        response: FiresCountResponse,
    },
    FeatureInfo { response: ProxyResponse },
    /// A request failed; `message` is user-facing.
    Failed { source: FetchSource, message: String },
}
