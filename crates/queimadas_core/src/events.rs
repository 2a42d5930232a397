//! UI notifications emitted by the dashboard state.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Notifications consumed by other parts of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Filters should be re-applied (a layer was added after the initial load).
    ApplyFilter,
    /// Dependent components should refresh after an extent reset.
    UpdateComponents,
    /// The visible-layers list changed.
    UpdateMapInformationsBox,
    /// Legend visibility was recomputed.
    LegendChanged,
    /// Graphic panels changed or finished loading.
    GraphicsChanged,
    /// A backend request failed; `message` is user-facing.
    RequestFailed { message: String },
}

/// Sending side of the dashboard event stream.
///
/// A sink without listeners drops events silently.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<DashboardEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver listeners poll.
    pub fn channel() -> (Self, Receiver<DashboardEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards every event.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: DashboardEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("dashboard event dropped: no listener");
            }
        }
    }
}

/// Events collected while a mutation runs and emitted once it has finished,
/// so listeners only observe consistent state.
#[derive(Debug, Default)]
pub(crate) struct PendingEvents {
    events: Vec<DashboardEvent>,
}

impl PendingEvents {
    pub(crate) fn push(&mut self, event: DashboardEvent) {
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }

    pub(crate) fn flush(self, sink: &EventSink) {
        for event in self.events {
            sink.emit(event);
        }
    }
}
