//! HTTP access to the dashboard backend endpoints.

use crate::error::ClientError;
use queimadas_core::constants::FEATURE_INFO_REQUEST_ID;
use queimadas_core::graphics::{ExportQuery, FiresCountQuery};
use queimadas_core::models::feature::ProxyResponse;
use queimadas_core::models::graphic::FiresCountResponse;
use queimadas_core::Config;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Build an endpoint URL below `base`, keeping any path prefix of `base`.
///
/// # Errors
/// [`ClientError::InvalidUrl`] when `base` does not parse or cannot carry a path.
pub fn api_url(base: &str, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = Url::parse(base)
        .map_err(|err| ClientError::InvalidUrl(format!("'{}': {}", base, err)))?;
    let mut path = url.path_segments_mut().map_err(|_| {
        ClientError::InvalidUrl(format!("'{}' cannot be used as an API base", base))
    })?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment);
    }
    drop(path);
    Ok(url)
}

/// Pull a readable message out of an error response body.
pub fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or(body)
            .to_string();
    }

    body.to_string()
}

/// Typed client for `/graphicsfirescount`, `/export-graphic-data` and `/proxy`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// Build a client for `config.server_url` with the configured request timeout.
    ///
    /// # Errors
    /// [`ClientError::InvalidUrl`] for an unusable server URL, or
    /// [`ClientError::Request`] when the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        api_url(&config.server_url, &[])?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base: config.server_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Count fires for one graphic.
    pub async fn fires_count(
        &self,
        query: &FiresCountQuery,
    ) -> Result<FiresCountResponse, ClientError> {
        let url = api_url(&self.base, &["graphicsfirescount"])?;
        tracing::debug!(graphic = %query.id, epoch = query.epoch.0, "requesting fires count");
        self.get_json(url, &query.query_pairs()).await
    }

    /// Download link for a graphic's data; the backend streams the file.
    pub fn export_url(&self, query: &ExportQuery) -> Result<Url, ClientError> {
        let mut url = api_url(&self.base, &["export-graphic-data"])?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        Ok(url)
    }

    /// Relay a GetFeatureInfo URL through the backend proxy.
    pub async fn feature_info(&self, url: &str) -> Result<ProxyResponse, ClientError> {
        let endpoint = api_url(&self.base, &["proxy"])?;
        let params = [
            ("url", url),
            ("requestId", FEATURE_INFO_REQUEST_ID),
            ("format", "json"),
        ];
        self.get_json(endpoint, &params).await
    }

    async fn get_json<T, Q>(&self, url: Url, params: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let res = self.http.get(url).query(params).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = match res.text().await {
                Ok(body) => body,
                Err(err) => format!("failed to read error response body: {}", err),
            };
            let message = error_message_for_response(status, &body);
            tracing::warn!(%status, message = %message, "backend request rejected");
            return Err(ClientError::Status { status, message });
        }
        Ok(res.json().await?)
    }
}
