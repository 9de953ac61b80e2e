// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Correlation Registry: outstanding requests keyed by correlation id.
//
// The first of {matching reply, timeout} to reach an entry removes it; the
// loser finds nothing and does nothing. That unconditional removal is what
// guarantees at most one resolution per request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::message::Envelope;

/// Completion callback for one pending request.
pub type Resolver = Box<dyn FnOnce(Envelope) + Send>;

/// One outstanding request awaiting a reply.
struct PendingInvocation {
    command: String,
    created_at: Instant,
    resolver: Resolver,
}

/// Map from correlation id to pending request.
///
/// Cloning yields another handle to the same table; the engine keeps one and
/// hands one to its inbound listener.
#[derive(Clone, Default)]
pub struct CorrelationRegistry {
    pending: Arc<Mutex<HashMap<String, PendingInvocation>>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `resolver` under `id`. A colliding id overwrites the old entry.
    pub fn register(&self, id: impl Into<String>, command: impl Into<String>, resolver: Resolver) {
        let id = id.into();
        let entry = PendingInvocation {
            command: command.into(),
            created_at: Instant::now(),
            resolver,
        };
        if let Ok(mut pending) = self.pending.lock() {
            if pending.insert(id.clone(), entry).is_some() {
                warn!(id = %id, "correlation id collision; previous request orphaned");
            }
        }
    }

    /// Hand `reply` to the resolver registered under `id` and forget it.
    ///
    /// Returns `false` (and does nothing) when no such request is pending:
    /// it already timed out, or this instance never sent it.
    pub fn resolve(&self, id: &str, reply: Envelope) -> bool {
        let Some(entry) = self.take(id) else {
            debug!(id = %id, "no pending request for reply; dropping");
            return false;
        };
        debug!(
            id = %id,
            command = %entry.command,
            elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
            "reply matched pending request"
        );
        // Called outside the lock: resolvers may re-enter the registry.
        (entry.resolver)(reply);
        true
    }

    /// Forget `id` without calling its resolver.
    pub fn evict(&self, id: &str) -> bool {
        self.take(id).is_some()
    }

    /// Drop every pending request without resolving it. Returns how many
    /// were dropped.
    pub fn clear(&self) -> usize {
        self.pending
            .lock()
            .map(|mut pending| {
                let count = pending.len();
                pending.clear();
                count
            })
            .unwrap_or(0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains_key(id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, id: &str) -> Option<PendingInvocation> {
        self.pending.lock().ok().and_then(|mut pending| pending.remove(id))
    }
}
