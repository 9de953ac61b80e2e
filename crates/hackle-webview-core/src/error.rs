// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the Hackle WebView bridge.

use thiserror::Error;

/// Top-level error type for all bridge operations.
///
/// These errors rarely reach application code: the client facade turns them
/// into fallback values or exception-tagged decisions. They are visible to
/// callers that drive the invocation engine directly.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Invocation outcomes --
    #[error("`{command}` timed out after {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("native host rejected `{command}`: {message}")]
    Remote { command: String, message: String },

    #[error("malformed reply for `{command}`: {reason}")]
    MalformedReply { command: String, reason: String },

    #[error("client closed while `{command}` was pending")]
    Disconnected { command: String },

    // -- Embedded SDK --
    #[error("initialization failed: {0}")]
    Initialization(String),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Whether this error is the synthesized "no answer in time" outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout { .. })
    }

    /// Build a `MalformedReply` from any displayable decode failure.
    pub fn malformed(command: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        BridgeError::MalformedReply {
            command: command.into(),
            reason: reason.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
