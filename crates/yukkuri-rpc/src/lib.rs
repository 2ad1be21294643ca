//! JSON-over-HTTP transport for the Panel.
//!
//! The Panel bridge exposes one endpoint, `POST {base_url}/invoke`, taking
//! `{"command": "<id>", "params": [..]}` and answering either
//! `{"result": ..}` or `{"error": {"code": .., "message": ..}}`.
//! [`HttpPanelTransport`] implements [`yukkuri_core::PanelTransport`] on top
//! of it, mapping connection failures to `TransportError::Unreachable` and
//! anything it cannot read to `TransportError::Protocol`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use yukkuri_rpc::{DefaultRpcTransport, RpcTransportConfig};
//!
//! let config = RpcTransportConfig::new().with_base_url("http://127.0.0.1:50080");
//! let transport = Arc::new(DefaultRpcTransport::new(&config).unwrap());
//! ```

#![deny(unused_crate_dependencies)]

mod config;
mod error;
mod http;
mod transport;
mod wire;

// ============================================================================
// Public API
// ============================================================================

// Configuration
pub use config::RpcTransportConfig;

// Errors
pub use error::{RpcError, RpcResult};

// Transport
pub use http::{HttpBackend, HttpReply, ReqwestBackend};
pub use transport::{DefaultRpcTransport, HttpPanelTransport};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use yukkuri_client as _;
