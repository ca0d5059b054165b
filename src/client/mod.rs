//! Remote configuration service boundary.
//!
//! [`ConfigService`] is the seam the settings core talks through; the HTTP
//! implementation lives in [`http`], and tests substitute their own.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::ProviderCatalog;
use crate::models::{ServerConfiguration, UpdateRequest};

pub mod http;
mod json;

pub use http::HttpConfigService;

/// Errors crossing the service boundary.
///
/// `Api` carries whatever detail the service put in its error body; callers
/// render errors with `Display` and must not need to look inside.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] simd_json::Error),

    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("service returned status {status}: {}", .message.as_deref().unwrap_or("an unknown error occurred"))]
    Api { status: u16, message: Option<String> },
}

impl ServiceError {
    /// True for stale-write rejections caused by a concurrent edit.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Api { status: 409, .. })
    }
}

/// The configuration service as consumed by the settings core.
#[async_trait]
pub trait ConfigService: Send + Sync {
    /// Fetch the current configuration document.
    async fn fetch_config(&self) -> Result<ServerConfiguration, ServiceError>;

    /// Submit a sparse update. The service rejects the write when the
    /// carried concurrency marker is older than its own state.
    async fn update_config(&self, request: &UpdateRequest) -> Result<(), ServiceError>;

    /// List stored API keys as name-to-placeholder pairs.
    async fn list_api_keys(&self) -> Result<BTreeMap<String, String>, ServiceError>;

    /// Delete one stored API key by name.
    async fn delete_api_key(&self, name: &str) -> Result<(), ServiceError>;

    /// Fetch the provider catalog.
    async fn fetch_catalog(&self) -> Result<ProviderCatalog, ServiceError>;
}
