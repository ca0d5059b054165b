//! simd-json plumbing for the service client.

use reqwest::{RequestBuilder, Response};
use serde::Serialize;

use super::ServiceError;

pub(crate) trait RequestJsonExt {
    /// Set the request body as JSON using simd-json for serialization.
    fn simd_json<T>(self, body: &T) -> Result<RequestBuilder, ServiceError>
    where
        T: Serialize + ?Sized;
}

pub(crate) trait ResponseJsonExt {
    /// Parse the response body as JSON using simd-json.
    async fn simd_json<T>(self) -> Result<T, ServiceError>
    where
        T: serde::de::DeserializeOwned;
}

impl RequestJsonExt for RequestBuilder {
    fn simd_json<T>(self, body: &T) -> Result<RequestBuilder, ServiceError>
    where
        T: Serialize + ?Sized,
    {
        let body = simd_json::to_vec(body)?;
        Ok(self
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body))
    }
}

impl ResponseJsonExt for Response {
    async fn simd_json<T>(self) -> Result<T, ServiceError>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.bytes().await?;
        let mut bytes = bytes.to_vec();
        let parsed = simd_json::from_slice(&mut bytes)?;
        Ok(parsed)
    }
}
