// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Message Envelope Codec.
//
// Every bridge message is a JSON object with a single well-known root key:
//
//   { "_hackle_message": { "id", "type", "payload", "browserProperties"? } }
//
// Requests and replies share the shape; direction is implied by who listens.
// The channel is shared with arbitrary page traffic, so decoding never fails
// loudly: anything that is not unambiguously ours decodes to `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use hackle_webview_core::error::Result;
use hackle_webview_core::types::BrowserProperties;

/// Root key namespacing every bridge message.
pub const MESSAGE_FIELD_NAME: &str = "_hackle_message";

/// `type` used by the native side to report a failed command.
pub const ERROR_TYPE: &str = "error";

/// Fresh random 128-bit correlation id.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// One bridge message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id pairing a request with its reply.
    pub id: String,
    /// Command name, or `"error"` on a failed reply.
    #[serde(rename = "type")]
    pub kind: String,
    /// Command-specific data; `null` for no-argument commands.
    #[serde(default)]
    pub payload: Value,
    /// Calling-context metadata attached by the sender.
    #[serde(
        rename = "browserProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub browser_properties: Option<BrowserProperties>,
}

#[derive(Serialize)]
struct WireRef<'a> {
    #[serde(rename = "_hackle_message")]
    message: &'a Envelope,
}

impl Envelope {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            payload,
            browser_properties: None,
        }
    }

    pub fn with_browser_properties(mut self, properties: BrowserProperties) -> Self {
        self.browser_properties = Some(properties);
        self
    }

    /// Whether this is a native failure report rather than a real reply.
    pub fn is_error(&self) -> bool {
        self.kind == ERROR_TYPE
    }

    /// Serialize under the namespace root key.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&WireRef { message: self })?)
    }

    /// Parse a raw channel message.
    ///
    /// Returns `None` for empty data, non-JSON, JSON without the root key,
    /// a root value of the wrong shape, or a missing/empty `id`.
    pub fn decode(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw == "undefined" || !raw.contains(MESSAGE_FIELD_NAME) {
            return None;
        }
        let mut data: Value = serde_json::from_str(raw).ok()?;
        let message = data.as_object_mut()?.remove(MESSAGE_FIELD_NAME)?;
        let envelope: Envelope = serde_json::from_value(message).ok()?;
        if envelope.id.is_empty() {
            return None;
        }
        Some(envelope)
    }
}
