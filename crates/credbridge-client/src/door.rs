//! Door-action client.
//!
//! Opening a door is a single unauthenticated `GET` to a configured URL.
//! The response body is returned for logging only; the bridge never
//! interprets it.

use async_trait::async_trait;

use crate::config::DoorConfig;
use crate::error::ClientError;

/// Response from the door endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorResponse {
    pub status: u16,
    pub body: String,
}

/// A physical access point that can be opened.
#[async_trait]
pub trait DoorAction: Send + Sync + std::fmt::Debug {
    /// Open the door. Called at most once per verified presentation.
    async fn open(&self) -> Result<DoorResponse, ClientError>;
}

/// [`DoorAction`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDoorClient {
    http: reqwest::Client,
    url: url::Url,
}

impl HttpDoorClient {
    pub fn new(config: DoorConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: crate::http_client(config.timeout_secs)?,
            url: config.url,
        })
    }

    /// The configured door URL.
    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait]
impl DoorAction for HttpDoorClient {
    async fn open(&self) -> Result<DoorResponse, ClientError> {
        let endpoint = "GET door";

        // Not retried: a repeated GET may open the door twice.
        let resp = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        if !(200..300).contains(&status) {
            return Err(ClientError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        tracing::info!(status, body = %body, "door opened");
        Ok(DoorResponse { status, body })
    }
}
