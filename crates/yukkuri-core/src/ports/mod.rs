//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP, socket or serialization-library types in any signature
//! - One command in, one reply out; no callbacks
//! - Adapter errors are mapped to `TransportError` before they cross the port

pub mod transport;

pub use transport::{
    FaultCode, PanelCommand, PanelFault, PanelTransport, PanelValue, TransportError,
};
