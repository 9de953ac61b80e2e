// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic contracts for the environment the client runs in.
//
// A `HostContext` is whatever embeds the client: a plain page, or a WebView
// whose native shell injected a bridge object and a readiness marker. The
// `MessagePort` is the one-directional send half of that bridge; replies come
// back through listeners registered on the host's shared message channel.

use std::sync::Arc;

use hackle_webview_core::types::{BrowserProperties, Page};

/// Callback invoked with the raw data of every message on the shared channel.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Identifies one registered listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Send primitive exposed by the native shell (`postMessage`-like).
///
/// Fire-and-forget: there is no delivery guarantee and no error path. A lost
/// message is indistinguishable from a native side that never answers.
pub trait MessagePort: Send + Sync {
    fn post_message(&self, serialized: &str);
}

/// Everything the client needs to know about its hosting environment.
pub trait HostContext: Send + Sync {
    /// Human-readable platform name (e.g. "Android WebView", "Browser").
    fn platform_name(&self) -> &str;

    /// The bridge object injected by the native shell, if any.
    fn bridge_port(&self) -> Option<Arc<dyn MessagePort>>;

    /// The global readiness marker set by the native shell.
    fn is_injected(&self) -> bool;

    /// Serialized `WebViewConfig` provided by the native shell, if any.
    fn webview_config(&self) -> Option<String>;

    /// Origin metadata for the current page.
    fn browser_properties(&self) -> BrowserProperties;

    /// Origin metadata for a specific page (engagement tracking).
    fn browser_properties_for(&self, page: &Page) -> BrowserProperties {
        let mut properties = self.browser_properties();
        properties.insert("pageTitle".into(), page.title.clone());
        properties.insert("pageUrl".into(), page.url.clone());
        properties
    }

    /// Register a handler on the shared message channel.
    ///
    /// `capture` listeners run before every bubbling listener; the bridge
    /// always registers in capture mode so that both native platforms deliver
    /// replies the same way.
    fn add_message_listener(&self, handler: MessageHandler, capture: bool) -> ListenerId;

    /// Deregister a handler. Unknown ids are ignored.
    fn remove_message_listener(&self, id: ListenerId);
}
