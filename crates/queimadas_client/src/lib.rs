//! HTTP client and background fetch worker for the Queimadas dashboard backend.

/// Typed access to the backend endpoints.
pub mod api;
/// Client error type.
pub mod error;
/// Worker thread serving [`queimadas_core::FetchCmd`] requests.
pub mod worker;

pub use api::ApiClient;
pub use error::ClientError;
pub use worker::{spawn_backend, BackendHandle};
