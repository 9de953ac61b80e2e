// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hackle WebView demo
//
// Entry point. Initialises logging, loads the client config named on the
// command line, then drives one client through a simulated native WebView
// host and one through a plain page with an embedded SDK.

mod demo;
mod services;

use std::path::PathBuf;
use std::sync::Arc;

use hackle_webview_bridge::MemoryHost;
use hackle_webview_client::{EmbeddedSdk, HackleClient, HackleManager, LocalSdk};
use hackle_webview_core::config::ClientConfig;

use services::config_file;
use services::native_shell::NativeShell;

const SDK_KEY: &str = "demo-sdk-key";

const WEBVIEW_CONFIG: &str =
    r#"{"automaticScreenTracking": true, "automaticEngagementTracking": true}"#;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Hackle WebView demo starting");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config_file::load_or_default(config_path.as_deref());

    let bridged = bridged_client(config.clone());
    let report = demo::run(&bridged).await;
    tracing::info!(?report, "bridged client finished");
    bridged.close();

    let direct = direct_client(config);
    let report = demo::run(&direct).await;
    tracing::info!(?report, "direct client finished");
}

/// Stand-in for the SDK instance living on either side of the bridge.
fn demo_sdk(session_id: &str) -> LocalSdk {
    LocalSdk::new(session_id)
        .with_variation(demo::EXPERIMENT_KEY, "B")
        .with_feature(demo::FEATURE_KEY, true)
        .with_remote_config("banner", "Spring sale")
}

/// A WebView whose native shell answers from its own SDK instance.
fn bridged_client(config: ClientConfig) -> HackleClient {
    let shell = NativeShell::new(Arc::new(demo_sdk("native-session")));
    let host = MemoryHost::injected(move |raw| shell.respond(raw));
    host.set_webview_config(WEBVIEW_CONFIG);
    host.set_browser_property("browserName", "WebView");
    HackleManager::new(Arc::new(host)).create_instance(SDK_KEY, config, embed)
}

/// A plain page: no bridge, so the SDK is embedded.
fn direct_client(config: ClientConfig) -> HackleClient {
    HackleManager::new(Arc::new(MemoryHost::new())).create_instance(SDK_KEY, config, embed)
}

fn embed(sdk_key: &str, _config: &ClientConfig) -> Arc<dyn EmbeddedSdk> {
    tracing::debug!(sdk_key, "embedding local sdk");
    Arc::new(demo_sdk("page-session"))
}
