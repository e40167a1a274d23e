use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::Result;

/// Public NASA API root.
pub const DEFAULT_BASE_URL: &str = "https://api.nasa.gov/";

/// HTTP seam the facade talks through.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// GET `request_uri` (relative to the API root) and return the body text.
    async fn get_text(&self, request_uri: &str) -> Result<String>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base: Url,
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// `base_url` should end in `/` so relative routes join beneath it.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self::with_client(Client::new(), Url::parse(base_url)?))
    }

    pub fn with_client(http: Client, base: Url) -> Self {
        Self { base, http }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get_text(&self, request_uri: &str) -> Result<String> {
        let url = self.base.join(request_uri)?;
        debug!(path = url.path(), "sending APOD request");

        let body = self.http.get(url).send().await?.error_for_status()?.text().await?;
        Ok(body)
    }
}
