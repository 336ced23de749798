//! Shared reqwest wrapper with retry

use reqwest::{Client, RequestBuilder, Response};
use tileseed_core::config::HttpConfig;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// A reqwest client bound to one service's base URL
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    service: &'static str,
    base_url: String,
    client: Client,
    retry: HttpConfig,
}

impl HttpClient {
    pub(crate) fn new(service: &'static str, base_url: &str, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder().timeout(http.timeout()).build()?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry: http.clone(),
        })
    }

    pub(crate) fn service(&self) -> &'static str {
        self.service
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub(crate) fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    /// Send a request, retrying transport errors and 5xx responses.
    ///
    /// The response is returned as-is; status handling is left to
    /// [`HttpClient::check`].
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let attempts = self.retry.retry_attempts.max(1);
        let mut attempt = 1;

        loop {
            let current = request.try_clone().ok_or_else(|| {
                ClientError::Other(format!("{} request cannot be retried", self.service))
            })?;

            match current.send().await {
                Ok(response) if response.status().is_server_error() && attempt < attempts => {
                    warn!(
                        service = self.service,
                        status = response.status().as_u16(),
                        attempt,
                        "server error, retrying"
                    );
                }
                Ok(response) => {
                    debug!(
                        service = self.service,
                        url = %response.url(),
                        status = response.status().as_u16(),
                        "response received"
                    );
                    return Ok(response);
                }
                Err(e) if attempt < attempts && (e.is_connect() || e.is_timeout()) => {
                    warn!(service = self.service, attempt, error = %e, "request failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.retry.retry_delay(attempt)).await;
            attempt += 1;
        }
    }

    /// Turn a non-success response into an error
    pub(crate) async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                service: self.service,
                url: response.url().to_string(),
            });
        }

        let message = response.text().await.unwrap_or_default();
        Err(ClientError::ApiError {
            service: self.service,
            status: status.as_u16(),
            message,
        })
    }
}
