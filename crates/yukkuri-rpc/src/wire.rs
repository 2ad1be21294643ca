//! JSON envelopes exchanged with the Panel bridge.
//!
//! Request: `{"command": "setVoiceSpeed", "params": [120, 0]}`
//!
//! Reply: `{"result": <primitive or null>}` or
//! `{"error": {"code": "invalidSlot", "message": "..."}}`.

use serde::{Deserialize, Serialize};
use yukkuri_core::{PanelCommand, PanelFault, PanelValue, TransportError};

#[derive(Debug, Serialize)]
pub(crate) struct InvokeRequest<'a> {
    pub command: PanelCommand,
    pub params: &'a [PanelValue],
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvokeReply {
    #[serde(default)]
    pub result: Option<PanelValue>,
    #[serde(default)]
    pub error: Option<PanelFault>,
}

impl InvokeReply {
    /// A fault wins over a result; a missing or null result is `Unit`.
    pub fn into_result(self) -> Result<PanelValue, TransportError> {
        match (self.error, self.result) {
            (Some(fault), _) => Err(TransportError::Panel(fault)),
            (None, Some(value)) => Ok(value),
            (None, None) => Ok(PanelValue::Unit),
        }
    }
}
