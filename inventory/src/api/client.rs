use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tfplug::Context;
use url::Url;

use super::error::ApiError;
use super::items::ItemsApi;

/// Item looked up when probing the service during configure
const PROBE_ITEM_ID: i64 = 1;

/// Inventory service API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Create a client for the service rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        // Relative joins replace the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Item API operations
    pub fn items(&self) -> ItemsApi<'_> {
        ItemsApi::new(self)
    }

    /// Check the service is reachable. Any HTTP status counts as reachable;
    /// only transport failures are errors.
    pub async fn ping(&self, ctx: &Context) -> Result<(), ApiError> {
        let response = self
            .send(ctx, self.get(&format!("items/{}", PROBE_ITEM_ID))?)
            .await?;

        tracing::debug!(status = %response.status(), "Inventory service probe answered");
        Ok(())
    }

    pub(crate) fn get(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        tracing::debug!("GET request to: {}", url);
        Ok(self.inner.http_client.get(url))
    }

    pub(crate) fn post(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        tracing::debug!("POST request to: {}", url);
        Ok(self.inner.http_client.post(url))
    }

    pub(crate) fn put(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        tracing::debug!("PUT request to: {}", url);
        Ok(self.inner.http_client.put(url))
    }

    pub(crate) fn delete(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        tracing::debug!("DELETE request to: {}", url);
        Ok(self.inner.http_client.delete(url))
    }

    /// Send a request, giving up as soon as the context is done
    pub(crate) async fn send(
        &self,
        ctx: &Context,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        if ctx.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        tokio::select! {
            response = request.send() => Ok(response?),
            _ = ctx.cancelled() => Err(ApiError::Cancelled),
        }
    }

    /// Read and decode a JSON response body
    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        response: Response,
    ) -> Result<T, ApiError> {
        let text = tokio::select! {
            text = response.text() => text?,
            _ = ctx.cancelled() => return Err(ApiError::Cancelled),
        };
        tracing::debug!("API response body: {}", text);

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::Decode(e.to_string())
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }
}
