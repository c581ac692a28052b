//! Rules transport — the HTTP seam between the registry and the remote service

use async_trait::async_trait;
use fh_core::{FirehoseConfig, FirehoseError, FirehoseResult, RuleSet};
use reqwest::header::AUTHORIZATION;

use crate::protocol::RulesRequest;

/// Read/write access to the remote rule set
#[async_trait]
pub trait RulesTransport: Send + Sync {
    /// `GET {base_uri}/rules`
    async fn get_rules(&self) -> FirehoseResult<RuleSet>;

    /// `POST {base_uri}/rules`
    async fn post_rules(&self, request: &RulesRequest) -> FirehoseResult<RuleSet>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpRulesTransport {
    client: reqwest::Client,
    rules_uri: String,
    bearer: String,
}

impl HttpRulesTransport {
    /// Build a transport from the shared config
    pub fn new(config: &FirehoseConfig) -> FirehoseResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| FirehoseError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Build a transport around an existing client
    pub fn with_client(client: reqwest::Client, config: &FirehoseConfig) -> Self {
        Self {
            client,
            rules_uri: config.rules_uri(),
            bearer: config.bearer(),
        }
    }

    /// Target endpoint
    pub fn rules_uri(&self) -> &str {
        &self.rules_uri
    }

    async fn decode(response: reqwest::Response) -> FirehoseResult<RuleSet> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FirehoseError::Transport(format!("rules body read failed: {e}")))?;

        if !status.is_success() {
            return Err(FirehoseError::remote(status.as_u16(), body));
        }
        if body.trim().is_empty() {
            return Ok(RuleSet::default());
        }
        serde_json::from_str(&body).map_err(|e| {
            FirehoseError::remote(status.as_u16(), format!("undecodable rules body: {e}"))
        })
    }
}

#[async_trait]
impl RulesTransport for HttpRulesTransport {
    async fn get_rules(&self) -> FirehoseResult<RuleSet> {
        let response = self
            .client
            .get(&self.rules_uri)
            .header(AUTHORIZATION, &self.bearer)
            .send()
            .await
            .map_err(|e| FirehoseError::Transport(format!("GET rules failed: {e}")))?;
        Self::decode(response).await
    }

    async fn post_rules(&self, request: &RulesRequest) -> FirehoseResult<RuleSet> {
        let response = self
            .client
            .post(&self.rules_uri)
            .header(AUTHORIZATION, &self.bearer)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                FirehoseError::Transport(format!("POST rules ({}) failed: {e}", request.kind()))
            })?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_targets_rules_endpoint() {
        let config = FirehoseConfig::new("https://api.example.com/2/tweets/search/stream", "tok");
        let transport = HttpRulesTransport::new(&config).unwrap();
        assert_eq!(
            transport.rules_uri(),
            "https://api.example.com/2/tweets/search/stream/rules"
        );
        assert_eq!(transport.bearer, "Bearer tok");
    }
}
