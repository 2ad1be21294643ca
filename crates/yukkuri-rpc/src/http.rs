//! HTTP backend abstraction for the Panel bridge.
//!
//! The transport talks to the bridge through this trait so tests can swap
//! in a fake. The production backend is a plain reqwest client; there is no
//! retry layer, a failed call is reported to the caller as-is.

use async_trait::async_trait;
use url::Url;

use crate::config::RpcTransportConfig;
use crate::error::RpcResult;

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Raw HTTP reply: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Something that can POST a JSON body and hand back the reply.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn post_json(&self, url: &Url, body: &serde_json::Value) -> RpcResult<HttpReply>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production backend using reqwest.
#[derive(Debug)]
pub struct ReqwestBackend {
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl ReqwestBackend {
    pub fn new(config: &RpcTransportConfig) -> RpcResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            auth_token: config.token.clone(),
        })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn post_json(&self, url: &Url, body: &serde_json::Value) -> RpcResult<HttpReply> {
        let mut request = self.client.post(url.as_str()).json(body);
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================
