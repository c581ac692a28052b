//! Stream sources — where the connector's bytes come from

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fh_core::FirehoseConfig;
use futures_util::{Stream, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;

use crate::connector::ConnectorError;
use crate::protocol::stream_url;

/// Response body as a stream of chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ConnectorError>> + Send>>;

/// Opens one streaming response per session
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Perform the handshake. `Ok(None)` means the response had no body.
    async fn open(&self) -> Result<Option<ByteStream>, ConnectorError>;

    /// Target description for logs
    fn describe(&self) -> String;
}

/// Filtered-stream endpoint over reqwest
#[derive(Debug, Clone)]
pub struct HttpStreamSource {
    client: reqwest::Client,
    url: url::Url,
    bearer: String,
    timeout: Duration,
}

impl HttpStreamSource {
    /// Build from the shared config
    pub fn new(config: &FirehoseConfig) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConnectorError::ConnectionFailed(format!("HTTP client: {}", e)))?;
        Self::with_client(client, config)
    }

    /// Build around an existing client
    pub fn with_client(client: reqwest::Client, config: &FirehoseConfig) -> Result<Self, ConnectorError> {
        Ok(Self {
            client,
            url: stream_url(&config.base_uri)?,
            bearer: config.bearer(),
            timeout: config.connect_timeout(),
        })
    }

    /// Full stream URL including query parameters
    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait]
impl StreamSource for HttpStreamSource {
    async fn open(&self) -> Result<Option<ByteStream>, ConnectorError> {
        let request = self
            .client
            .get(self.url.clone())
            .header(AUTHORIZATION, &self.bearer)
            .send();

        // Bounds the handshake only; the body may stream indefinitely
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ConnectorError::Timeout)?
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Status {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Ok(None);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ConnectorError::Read(e.to_string())));
        Ok(Some(Box::pin(body)))
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
