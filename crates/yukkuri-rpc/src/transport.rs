//! `PanelTransport` over JSON/HTTP.

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;
use url::Url;
use yukkuri_core::{PanelCommand, PanelTransport, PanelValue, TransportError};

use crate::config::RpcTransportConfig;
use crate::error::{RpcError, RpcResult};
use crate::http::{HttpBackend, HttpReply, ReqwestBackend};
use crate::wire::{InvokeReply, InvokeRequest};

/// HTTP transport using the reqwest backend.
pub type DefaultRpcTransport = HttpPanelTransport<ReqwestBackend>;

/// Sends each Panel command as one `POST {base_url}/invoke`.
///
/// Every request carries its own reply, so overlapping calls are safe and
/// the client does not need to serialize them.
#[derive(Debug)]
pub struct HttpPanelTransport<B: HttpBackend> {
    backend: B,
    invoke_url: Url,
}

impl DefaultRpcTransport {
    /// Create a transport from `config`.
    ///
    /// Fails if the base URL does not parse or the HTTP client cannot be
    /// built.
    pub fn new(config: &RpcTransportConfig) -> RpcResult<Self> {
        let backend = ReqwestBackend::new(config)?;
        Self::with_backend(config, backend)
    }
}

impl<B: HttpBackend> HttpPanelTransport<B> {
    /// Create a transport over a custom backend.
    pub fn with_backend(config: &RpcTransportConfig, backend: B) -> RpcResult<Self> {
        Ok(Self {
            backend,
            invoke_url: invoke_url(&config.base_url)?,
        })
    }

    /// The URL every command is posted to.
    #[must_use]
    pub const fn invoke_url(&self) -> &Url {
        &self.invoke_url
    }

    async fn round_trip(
        &self,
        command: PanelCommand,
        params: &[PanelValue],
    ) -> RpcResult<Result<PanelValue, TransportError>> {
        let body = serde_json::to_value(InvokeRequest { command, params })?;
        let started = Instant::now();
        let reply = self.backend.post_json(&self.invoke_url, &body).await?;
        debug!(
            command = %command,
            status = reply.status,
            elapsed_ms = started.elapsed().as_millis(),
            "Panel bridge round trip"
        );
        self.decode(reply)
    }

    fn decode(&self, reply: HttpReply) -> RpcResult<Result<PanelValue, TransportError>> {
        match serde_json::from_str::<InvokeReply>(&reply.body) {
            // A fault body is authoritative whatever the status
            Ok(envelope) if envelope.error.is_some() => Ok(envelope.into_result()),
            Ok(envelope) if reply.is_success() => Ok(envelope.into_result()),
            Err(err) if reply.is_success() => Err(RpcError::InvalidResponse {
                message: err.to_string(),
            }),
            _ => Err(RpcError::Status {
                status: reply.status,
                url: self.invoke_url.to_string(),
            }),
        }
    }
}

/// `{base}/invoke`, keeping any path prefix on the base URL.
fn invoke_url(base: &str) -> RpcResult<Url> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("invoke")?)
}

#[async_trait]
impl<B: HttpBackend> PanelTransport for HttpPanelTransport<B> {
    async fn invoke(
        &self,
        command: PanelCommand,
        params: Vec<PanelValue>,
    ) -> Result<PanelValue, TransportError> {
        self.round_trip(command, &params).await?
    }

    fn supports_concurrent_calls(&self) -> bool {
        true
    }
}
