//! HTTP implementation of the configuration service.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::json::{RequestJsonExt, ResponseJsonExt};
use super::{ConfigService, ServiceError};
use crate::catalog::ProviderCatalog;
use crate::models::{ServerConfiguration, UpdateRequest};

/// Request timeouts for the service client.
#[derive(Debug, Clone, Copy)]
pub struct ServiceTimeouts {
    pub api: Duration,
    pub connect: Duration,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            api: Duration::from_millis(30_000),
            connect: Duration::from_millis(10_000),
        }
    }
}

/// Talks to the configuration service over its REST surface:
/// `/api/config`, `/api/config/keys`, and `/api/providers`.
pub struct HttpConfigService {
    base: Url,
    token: Option<String>,
    client: Client,
}

impl HttpConfigService {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeouts: ServiceTimeouts,
    ) -> Result<Self, ServiceError> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let mut normalized = base_url.trim().trim_end_matches('/').to_string();
        normalized.push('/');
        let base = Url::parse(&normalized)?;
        let client = Client::builder()
            .timeout(timeouts.api)
            .connect_timeout(timeouts.connect)
            .build()?;
        Ok(Self {
            base,
            token,
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ServiceError> {
        let url = self.base.join(path)?;
        debug!(method = %method, url = %url, "service request");
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn check(response: Response) -> Result<Response, ServiceError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = match response.bytes().await {
            Ok(bytes) => extract_error_message(&bytes),
            Err(_) => None,
        };
        Err(ServiceError::Api { status, message })
    }
}

/// Pulls a human-readable message out of a service error body. The service
/// writes either `{"error": {"message": ...}}` or a flat `{"message": ...}`;
/// anything else yields no detail.
fn extract_error_message(bytes: &[u8]) -> Option<String> {
    let mut raw = bytes.to_vec();
    let value: serde_json::Value = simd_json::from_slice(&mut raw).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct ApiKeyListing {
    #[serde(default)]
    api_keys: BTreeMap<String, String>,
}

#[async_trait]
impl ConfigService for HttpConfigService {
    async fn fetch_config(&self) -> Result<ServerConfiguration, ServiceError> {
        let response = self.request(Method::GET, "api/config")?.send().await?;
        Self::check(response).await?.simd_json().await
    }

    async fn update_config(&self, request: &UpdateRequest) -> Result<(), ServiceError> {
        let response = self
            .request(Method::POST, "api/config")?
            .simd_json(request)?
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_api_keys(&self) -> Result<BTreeMap<String, String>, ServiceError> {
        let response = self.request(Method::GET, "api/config/keys")?.send().await?;
        let listing: ApiKeyListing = Self::check(response).await?.simd_json().await?;
        Ok(listing.api_keys)
    }

    async fn delete_api_key(&self, name: &str) -> Result<(), ServiceError> {
        let response = self
            .request(Method::DELETE, &format!("api/config/keys/{name}"))?
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_catalog(&self) -> Result<ProviderCatalog, ServiceError> {
        let response = self.request(Method::GET, "api/providers")?.send().await?;
        Self::check(response).await?.simd_json().await
    }
}
