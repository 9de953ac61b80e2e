// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client and WebView configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wait for a bridged reply before falling back.
pub const DEFAULT_INVOKE_TIMEOUT_MS: u64 = 5000;

/// Default wait for the embedded SDK to become ready.
pub const DEFAULT_INITIALIZE_TIMEOUT_MS: u64 = 10_000;

/// Settings supplied by the application when it creates a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// How long a bridged call waits for its reply (default 5000 ms).
    pub invoke_timeout_ms: u64,
    /// How long `on_initialized` waits in the direct variant when the caller
    /// gives no explicit timeout.
    pub initialize_timeout_ms: u64,
    /// Verbose SDK diagnostics.
    pub debug: bool,
    /// Forwarded to the embedded SDK; has no effect on the bridged variant.
    pub user_explorer: bool,
    /// Extra origin metadata attached to every outbound message. Entries
    /// override the host's own browser properties.
    pub browser_properties: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms)
    }

    pub fn initialize_timeout(&self) -> Duration {
        Duration::from_millis(self.initialize_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            invoke_timeout_ms: DEFAULT_INVOKE_TIMEOUT_MS,
            initialize_timeout_ms: DEFAULT_INITIALIZE_TIMEOUT_MS,
            debug: false,
            user_explorer: false,
            browser_properties: BTreeMap::new(),
        }
    }
}

/// Tracking switches injected by the native shell hosting the WebView.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebViewConfig {
    /// Send a `$page_view` event whenever a page starts.
    pub automatic_screen_tracking: bool,
    /// Send a `$engagement` event whenever the SDK reports engagement time.
    pub automatic_engagement_tracking: bool,
}

impl WebViewConfig {
    /// Parse the host's serialized config; `None` on any parse failure.
    pub fn parse(serialized: &str) -> Option<Self> {
        serde_json::from_str(serialized).ok()
    }
}

/// Options for `on_initialized`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitializeOptions {
    pub timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_five_seconds() {
        let config = ClientConfig::default();
        assert_eq!(config.invoke_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"invokeTimeoutMs": 250}"#).unwrap();
        assert_eq!(config.invoke_timeout_ms, 250);
        assert_eq!(config.initialize_timeout_ms, DEFAULT_INITIALIZE_TIMEOUT_MS);
        assert!(!config.debug);
    }

    #[test]
    fn webview_config_parses_camel_case() {
        let config = WebViewConfig::parse(r#"{"automaticScreenTracking": true}"#).unwrap();
        assert!(config.automatic_screen_tracking);
        assert!(!config.automatic_engagement_tracking);
    }

    #[test]
    fn webview_config_rejects_garbage() {
        assert!(WebViewConfig::parse("not json").is_none());
        assert_eq!(WebViewConfig::default(), WebViewConfig {
            automatic_screen_tracking: false,
            automatic_engagement_tracking: false,
        });
    }
}
