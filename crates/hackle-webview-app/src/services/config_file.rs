// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client configuration loaded from a JSON file.

use std::path::Path;

use hackle_webview_core::config::ClientConfig;
use hackle_webview_core::error::Result;
use tracing::{info, warn};

/// Read a `ClientConfig` from `path`. Missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let data = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&data)?;
    info!(path = %path.display(), "loaded client config");
    Ok(config)
}

/// Config from the optional path, falling back to defaults on any failure.
pub fn load_or_default(path: Option<&Path>) -> ClientConfig {
    let Some(path) = path else {
        return ClientConfig::default();
    };
    load_config(path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "unusable client config; using defaults");
        ClientConfig::default()
    })
}
