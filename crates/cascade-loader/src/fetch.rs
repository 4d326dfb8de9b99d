//! Network boundary
//!
//! `Fetcher` is the seam between loaders and whatever moves bytes. The
//! reqwest-backed `HttpFetcher` runs its requests on a tokio runtime and
//! reports non-2xx responses as `TransportError::Status`.

use crate::config::LoaderConfig;
use crate::resource::Request;
use cascade_core::{Async, CascadeError, Result};
use reqwest::Client;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

/// Source of raw payload bytes for a request
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: &Request) -> Async<Vec<u8>>;
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch(&self, request: &Request) -> Async<Vec<u8>> {
        (**self).fetch(request)
    }
}

// ----------------------------------------------------------------------------
// HTTP
// ----------------------------------------------------------------------------

/// HTTP(S) fetcher on a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    handle: Handle,
}

impl HttpFetcher {
    pub fn new(handle: Handle, config: &LoaderConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CascadeError::config_error(format!("http client: {e}")))?;
        Ok(Self { client, handle })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &Request) -> Async<Vec<u8>> {
        let client = self.client.clone();
        let request = request.clone();
        Async::from_future(self.handle.clone(), move || {
            let client = client.clone();
            let request = request.clone();
            async move { get_bytes(&client, &request).await }
        })
    }
}

async fn get_bytes(client: &Client, request: &Request) -> Result<Vec<u8>> {
    let url = request.url().as_str();
    let mut builder = client.get(request.url().clone());
    for (name, value) in request.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder
        .send()
        .await
        .map_err(|e| CascadeError::request_failed(url, e.to_string()))?;
    let status = response.status();
    debug!(url, status = status.as_u16(), "http response");
    if !status.is_success() {
        return Err(CascadeError::http_status(url, status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| CascadeError::request_failed(url, e.to_string()))?;
    Ok(body.to_vec())
}
