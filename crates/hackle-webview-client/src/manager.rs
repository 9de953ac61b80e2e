// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client construction: inspect the host once, build the matching variant.

use std::sync::Arc;

use tracing::{error, info};

use hackle_webview_bridge::{ClientVariant, HostContext, Transceiver, select};
use hackle_webview_core::config::{ClientConfig, WebViewConfig};

use crate::client::HackleClient;
use crate::direct::DirectClient;
use crate::sdk::EmbeddedSdk;
use crate::webview::WebViewClient;

/// Creates clients for one hosting environment.
pub struct HackleManager {
    host: Arc<dyn HostContext>,
}

impl HackleManager {
    pub fn new(host: Arc<dyn HostContext>) -> Self {
        Self { host }
    }

    /// Build a client for `sdk_key`.
    ///
    /// The environment is inspected exactly once, here. `embed` is only
    /// called when the host turns out not to be a bridged WebView.
    pub fn create_instance<F>(&self, sdk_key: &str, config: ClientConfig, embed: F) -> HackleClient
    where
        F: FnOnce(&str, &ClientConfig) -> Arc<dyn EmbeddedSdk>,
    {
        match select(self.host.as_ref()) {
            ClientVariant::Bridged(port) => {
                let webview_config = self.webview_config();
                info!(
                    screen_tracking = webview_config.automatic_screen_tracking,
                    engagement_tracking = webview_config.automatic_engagement_tracking,
                    "creating bridged hackle client"
                );
                let transceiver = Transceiver::new(Arc::clone(&self.host), port);
                HackleClient::WebView(WebViewClient::new(transceiver, &config, webview_config))
            }
            ClientVariant::Direct => {
                info!("creating direct hackle client");
                let sdk = embed(sdk_key, &config);
                HackleClient::Direct(DirectClient::new(sdk, &config))
            }
        }
    }

    fn webview_config(&self) -> WebViewConfig {
        let Some(serialized) = self.host.webview_config() else {
            return WebViewConfig::default();
        };
        WebViewConfig::parse(&serialized).unwrap_or_else(|| {
            error!("failed to parse webview config injected by host; using defaults");
            WebViewConfig::default()
        })
    }
}
