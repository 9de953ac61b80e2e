// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process host context for desktop/CI builds and tests.
//
// `MemoryHost` plays the part of the page the client is embedded in: it owns
// the shared message channel, optionally exposes an injected bridge port, and
// can be given a responder closure that stands in for the native shell.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use hackle_webview_core::types::BrowserProperties;
use tracing::debug;

use crate::traits::{HostContext, ListenerId, MessageHandler, MessagePort};

/// Produces the native side's reply (if any) for one outbound message.
pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

struct Registered {
    id: ListenerId,
    capture: bool,
    handler: MessageHandler,
}

#[derive(Default)]
struct HostInner {
    listeners: Mutex<Vec<Registered>>,
    next_listener: AtomicU64,
    port: Mutex<Option<Arc<dyn MessagePort>>>,
    injected: AtomicBool,
    webview_config: Mutex<Option<String>>,
    browser_properties: Mutex<BrowserProperties>,
    outbox: Mutex<Vec<String>>,
}

impl HostInner {
    fn dispatch(&self, data: &str) {
        // Snapshot the handlers so they may (de)register listeners or post
        // replies without deadlocking on the listener table.
        let handlers: Vec<MessageHandler> = match self.listeners.lock() {
            Ok(listeners) => {
                let capturing = listeners.iter().filter(|l| l.capture);
                let bubbling = listeners.iter().filter(|l| !l.capture);
                capturing
                    .chain(bubbling)
                    .map(|l| Arc::clone(&l.handler))
                    .collect()
            }
            Err(_) => return,
        };
        for handler in handlers {
            handler(data);
        }
    }
}

/// Cheaply cloneable in-process host; clones share all state.
#[derive(Clone, Default)]
pub struct MemoryHost {
    inner: Arc<HostInner>,
}

impl MemoryHost {
    /// A plain page: no bridge object, no marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// A WebView whose native shell answers through `responder`.
    pub fn injected(responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        let host = Self::new();
        host.install_bridge(responder);
        host.set_injected(true);
        host
    }

    /// Expose a bridge port whose replies come from `responder`.
    ///
    /// Replies are dispatched synchronously on the shared channel from inside
    /// `post_message`, the way a fast native shell would answer.
    pub fn install_bridge(&self, responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static) {
        let port = LoopbackPort {
            host: Arc::downgrade(&self.inner),
            responder: Arc::new(responder),
        };
        if let Ok(mut slot) = self.inner.port.lock() {
            *slot = Some(Arc::new(port));
        }
    }

    /// Expose a bridge port that never answers.
    pub fn install_silent_bridge(&self) {
        self.install_bridge(|_| None);
    }

    /// Set or clear the global readiness marker.
    pub fn set_injected(&self, injected: bool) {
        self.inner.injected.store(injected, Ordering::SeqCst);
    }

    pub fn set_webview_config(&self, serialized: impl Into<String>) {
        if let Ok(mut slot) = self.inner.webview_config.lock() {
            *slot = Some(serialized.into());
        }
    }

    pub fn set_browser_property(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut properties) = self.inner.browser_properties.lock() {
            properties.insert(key.into(), value.into());
        }
    }

    /// Deliver `data` to every listener on the shared channel.
    pub fn dispatch(&self, data: &str) {
        self.inner.dispatch(data);
    }

    /// Every message posted through the bridge port so far, oldest first.
    pub fn sent_messages(&self) -> Vec<String> {
        self.inner
            .outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }
}

impl HostContext for MemoryHost {
    fn platform_name(&self) -> &str {
        "In-memory host"
    }

    fn bridge_port(&self) -> Option<Arc<dyn MessagePort>> {
        self.inner.port.lock().ok().and_then(|slot| slot.clone())
    }

    fn is_injected(&self) -> bool {
        self.inner.injected.load(Ordering::SeqCst)
    }

    fn webview_config(&self) -> Option<String> {
        self.inner
            .webview_config
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
    }

    fn browser_properties(&self) -> BrowserProperties {
        self.inner
            .browser_properties
            .lock()
            .map(|properties| properties.clone())
            .unwrap_or_default()
    }

    fn add_message_listener(&self, handler: MessageHandler, capture: bool) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push(Registered {
                id,
                capture,
                handler,
            });
        }
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.retain(|l| l.id != id);
        }
    }
}

/// Port that records every message and feeds it to a responder.
struct LoopbackPort {
    host: Weak<HostInner>,
    responder: Responder,
}

impl MessagePort for LoopbackPort {
    fn post_message(&self, serialized: &str) {
        let Some(host) = self.host.upgrade() else {
            debug!("host gone; dropping outbound message");
            return;
        };
        if let Ok(mut outbox) = host.outbox.lock() {
            outbox.push(serialized.to_owned());
        }
        if let Some(reply) = (self.responder)(serialized) {
            host.dispatch(&reply);
        }
    }
}
