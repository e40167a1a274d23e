use std::sync::Arc;

use crate::{
    apod::Apod,
    error::Result,
    transport::{DEFAULT_BASE_URL, ReqwestTransport},
};

/// Entry point to the NASA open APIs. Only APOD is wired up.
#[derive(Debug)]
pub struct NasaClient {
    apod: Apod,
}

impl NasaClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: &str) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::with_base_url(base_url)?);
        Ok(Self { apod: Apod::new(transport, token) })
    }

    pub fn apod(&self) -> &Apod {
        &self.apod
    }
}
