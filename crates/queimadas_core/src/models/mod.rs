//! Data models for the dashboard configuration and backend payloads.

pub mod feature;
pub mod graphic;
pub mod layer;
pub mod satellite;
pub mod subtitle;
