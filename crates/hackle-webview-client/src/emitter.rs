// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application-visible client events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

/// Events a client publishes to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The current identity may have changed. Re-read it; the event itself
    /// carries nothing.
    UserUpdated,
}

/// Callback registered with [`Emitter::on`].
pub type EventHandler = Arc<dyn Fn(ClientEvent) + Send + Sync>;

/// Returned by [`Emitter::on`]; pass it to [`Emitter::off`] to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Fans client events out to synchronous callbacks and async subscribers.
pub struct Emitter {
    sender: broadcast::Sender<ClientEvent>,
    handlers: Mutex<Vec<(ListenerHandle, EventHandler)>>,
    next_handle: AtomicU64,
}

impl Emitter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            handlers: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    /// Register a callback invoked synchronously on every event.
    pub fn on(&self, handler: impl Fn(ClientEvent) + Send + Sync + 'static) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.push((handle, Arc::new(handler)));
        }
        handle
    }

    /// Unregister a callback. Returns `false` for an unknown handle.
    pub fn off(&self, handle: ListenerHandle) -> bool {
        self.handlers
            .lock()
            .map(|mut handlers| {
                let before = handlers.len();
                handlers.retain(|(h, _)| *h != handle);
                handlers.len() != before
            })
            .unwrap_or(false)
    }

    /// A receiver that sees every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ClientEvent) {
        let handlers: Vec<EventHandler> = match self.handlers.lock() {
            Ok(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            Err(_) => Vec::new(),
        };
        for handler in handlers {
            handler(event);
        }
        // No subscribers is not an error.
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(?event, receivers, "client event emitted");
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
