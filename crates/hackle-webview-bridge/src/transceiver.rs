// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport Port: the send half plus an explicitly owned inbound subscription.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::traits::{HostContext, ListenerId, MessageHandler, MessagePort};

/// An active listener registration. Dropping it deregisters the handler.
pub struct Subscription {
    host: Arc<dyn HostContext>,
    id: ListenerId,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(listener = self.id.0, "removing bridge message listener");
        self.host.remove_message_listener(self.id);
    }
}

/// Sends serialized messages through the native port and owns the single
/// inbound listener of one client instance.
pub struct Transceiver {
    host: Arc<dyn HostContext>,
    port: Arc<dyn MessagePort>,
    subscription: Mutex<Option<Subscription>>,
}

impl Transceiver {
    pub fn new(host: Arc<dyn HostContext>, port: Arc<dyn MessagePort>) -> Self {
        Self {
            host,
            port,
            subscription: Mutex::new(None),
        }
    }

    /// The hosting environment this transceiver is attached to.
    pub fn host(&self) -> &Arc<dyn HostContext> {
        &self.host
    }

    /// Fire-and-forget send.
    pub fn post(&self, serialized: &str) {
        self.port.post_message(serialized);
    }

    /// Install `handler` as the inbound listener (capture mode).
    ///
    /// At most one listener is active: installing a new one releases the
    /// previous registration first.
    pub fn add_listener(&self, handler: MessageHandler) {
        let id = self.host.add_message_listener(handler, true);
        debug!(listener = id.0, "installed bridge message listener");
        let subscription = Subscription {
            host: Arc::clone(&self.host),
            id,
        };
        if let Ok(mut slot) = self.subscription.lock() {
            // The old subscription (if any) is dropped here, after the slot
            // already holds the new one.
            let _previous = slot.replace(subscription);
        }
    }

    /// Release the inbound listener. Idempotent.
    pub fn cleanup(&self) {
        if let Ok(mut slot) = self.subscription.lock() {
            slot.take();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.subscription
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    fn transceiver(host: &MemoryHost) -> Transceiver {
        host.install_silent_bridge();
        let port = host.bridge_port().unwrap();
        Transceiver::new(Arc::new(host.clone()), port)
    }

    #[test]
    fn post_goes_through_port() {
        let host = MemoryHost::new();
        let transceiver = transceiver(&host);
        transceiver.post("hello");
        assert_eq!(host.sent_messages(), vec!["hello".to_string()]);
    }

    #[test]
    fn cleanup_releases_listener() {
        let host = MemoryHost::new();
        let transceiver = transceiver(&host);
        transceiver.add_listener(Arc::new(|_: &str| {}));
        assert_eq!(host.listener_count(), 1);
        assert!(transceiver.is_listening());

        transceiver.cleanup();
        assert_eq!(host.listener_count(), 0);
        assert!(!transceiver.is_listening());

        // Second cleanup is a no-op.
        transceiver.cleanup();
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn only_one_listener_is_active() {
        let host = MemoryHost::new();
        let transceiver = transceiver(&host);
        transceiver.add_listener(Arc::new(|_: &str| {}));
        transceiver.add_listener(Arc::new(|_: &str| {}));
        assert_eq!(host.listener_count(), 1);
    }

    #[test]
    fn bridge_listener_sees_replies_before_page_listeners() {
        let host = MemoryHost::injected(|raw| Some(format!("reply:{raw}")));
        let port = host.bridge_port().unwrap();
        let transceiver = Transceiver::new(Arc::new(host.clone()), port);
        let order = Arc::new(Mutex::new(Vec::new()));

        // A page listener registered first, in bubbling mode.
        let page = Arc::clone(&order);
        host.add_message_listener(
            Arc::new(move |data: &str| page.lock().unwrap().push(format!("page {data}"))),
            false,
        );
        let bridge = Arc::clone(&order);
        transceiver.add_listener(Arc::new(move |data: &str| {
            bridge.lock().unwrap().push(format!("bridge {data}"))
        }));

        transceiver.post("ping");
        assert_eq!(
            *order.lock().unwrap(),
            vec!["bridge reply:ping".to_string(), "page reply:ping".to_string()]
        );
    }

    #[test]
    fn dropping_transceiver_releases_listener() {
        let host = MemoryHost::new();
        {
            let transceiver = transceiver(&host);
            transceiver.add_listener(Arc::new(|_: &str| {}));
            assert_eq!(host.listener_count(), 1);
        }
        assert_eq!(host.listener_count(), 0);
    }
}
