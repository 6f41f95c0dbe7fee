//! Gateway message format
//!
//! Every frame in either direction is a JSON object `{ op, t?, s?, d? }`.

use super::{CloseCode, HelloPayload, OpCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::bare(OpCode::HeartbeatAck)
    }

    /// A frame with only an op code, mostly useful for client-side tooling
    #[must_use]
    pub fn bare(op: OpCode) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d: None,
        }
    }

    /// A client command frame carrying `data`
    pub fn command(op: OpCode, data: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            op,
            t: None,
            s: None,
            d: Some(serde_json::to_value(data)?),
        })
    }

    /// Parse an incoming text frame.
    ///
    /// Op codes outside the protocol map to `UnknownOpcode`; anything else
    /// that fails to decode maps to `DecodeError`.
    pub fn parse(text: &str) -> Result<Self, CloseCode> {
        let value: Value = serde_json::from_str(text).map_err(|_| CloseCode::DecodeError)?;

        let raw_op = value
            .get("op")
            .and_then(Value::as_u64)
            .ok_or(CloseCode::DecodeError)?;
        let known = u8::try_from(raw_op).ok().and_then(OpCode::from_u8);
        if known.is_none() {
            return Err(CloseCode::UnknownOpcode);
        }

        serde_json::from_value(value).map_err(|_| CloseCode::DecodeError)
    }

    /// Decode the `d` field into a typed payload. A missing `d` decodes as `null`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.d.clone().unwrap_or(Value::Null))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Build the close frame parts for `code`
    #[must_use]
    pub fn close_frame(code: CloseCode) -> (u16, String) {
        (code.as_u16(), code.description().to_string())
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
