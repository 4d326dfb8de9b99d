//! Requests and the resources that decode them

use cascade_core::{catch_panic, CascadeError, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Turns fetched bytes into a value
pub type Decoder<T> = Arc<dyn Fn(&[u8]) -> Result<T> + Send + Sync>;

// ----------------------------------------------------------------------------
// Request
// ----------------------------------------------------------------------------

/// Description of what to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: Url,
    headers: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Parse `url` into a GET request
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| CascadeError::config_error(format!("invalid URL {url}: {e}")))?;
        Ok(Self::get(parsed))
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

// ----------------------------------------------------------------------------
// Resource
// ----------------------------------------------------------------------------

/// A request together with the decoder for its payload.
///
/// Cache tiers key their entries by `url()`, so two resources for the same
/// URL share cache entries within one loader.
pub struct Resource<T> {
    request: Request,
    decoder: Decoder<T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            request: self.request.clone(),
            decoder: self.decoder.clone(),
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Resource<T> {
    pub fn new<F>(request: Request, decode: F) -> Self
    where
        F: Fn(&[u8]) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            request,
            decoder: Arc::new(decode),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Cache key of this resource
    pub fn url(&self) -> &str {
        self.request.url.as_str()
    }

    /// Run the decoder; a panicking decoder becomes `Err(Panicked)`
    pub fn decode(&self, bytes: &[u8]) -> Result<T> {
        catch_panic(|| (self.decoder)(bytes))
    }

    /// Same request, with `f` applied to every decoded value
    pub fn map<U, F>(&self, f: F) -> Resource<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        let decoder = self.decoder.clone();
        Resource {
            request: self.request.clone(),
            decoder: Arc::new(move |bytes: &[u8]| decoder(bytes).and_then(&f)),
        }
    }
}

impl Resource<Vec<u8>> {
    /// Raw payload bytes
    pub fn bytes(request: Request) -> Self {
        Self::new(request, |bytes| Ok(bytes.to_vec()))
    }
}

impl Resource<String> {
    /// Payload decoded as UTF-8 text
    pub fn text(request: Request) -> Self {
        Self::new(request, |bytes| {
            String::from_utf8(bytes.to_vec()).map_err(|e| CascadeError::decode(e.to_string()))
        })
    }
}

impl<T: DeserializeOwned + 'static> Resource<T> {
    /// Payload decoded as JSON
    pub fn json(request: Request) -> Self {
        Self::new(request, |bytes| {
            serde_json::from_slice(bytes).map_err(|e| CascadeError::decode(e.to_string()))
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
