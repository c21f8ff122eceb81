//! Thin reqwest wrapper used for every call to the articulation API.

use crate::error::FetchError;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("assist-transfers/", env!("CARGO_PKG_VERSION"));

/// A fetched response with its body already read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Turn a non-200 response into a [`FetchError::Status`].
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Shared HTTP client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpClient {
    /// Build a client. `timeout` of `None` leaves timing to the transport.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| FetchError::Network {
                url: String::new(),
                source,
            })?;

        Ok(Self { client, timeout })
    }

    /// GET a URL and read the whole body as text.
    ///
    /// Non-200 statuses are returned as responses, not errors; callers decide.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let network = |source: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let resp = request.send().await.map_err(network)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(network)?;

        debug!(url, status, bytes = body.len(), "GET complete");

        Ok(HttpResponse {
            url: url.to_string(),
            status,
            body,
        })
    }
}
