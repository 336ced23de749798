//! Tile proxy configuration endpoint

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tileseed_core::config::{HttpConfig, MapproxyConfig};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::http::HttpClient;
use crate::traits::ProxyConfigSource;

/// Fetches the live mapproxy configuration as YAML
#[derive(Debug, Clone)]
pub struct MapproxyConfigClient {
    http: HttpClient,
}

impl MapproxyConfigClient {
    pub fn new(mapproxy: &MapproxyConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("MapproxyApi", &mapproxy.api_url, http)?,
        })
    }
}

#[async_trait]
impl ProxyConfigSource for MapproxyConfigClient {
    #[instrument(skip(self))]
    async fn get_config(&self) -> Result<String> {
        let request = self.http.get("/config").header(ACCEPT, "application/yaml");
        let response = self.http.check(self.http.send(request).await?).await?;
        let body = response.text().await?;
        debug!(bytes = body.len(), "fetched mapproxy config");
        Ok(body)
    }
}
