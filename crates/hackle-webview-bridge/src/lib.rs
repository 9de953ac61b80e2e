// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Hackle WebView — host environment abstractions.
//!
//! This crate defines the contract between the client and whatever embeds
//! it (a plain page or a native WebView shell), the transport port used to
//! reach the native side, and the one-time environment selection that picks
//! between the bridged and the directly-embedded client.

pub mod memory;
pub mod traits;
pub mod transceiver;

use std::sync::Arc;

use tracing::info;

pub use memory::MemoryHost;
pub use traits::{HostContext, ListenerId, MessageHandler, MessagePort};
pub use transceiver::{Subscription, Transceiver};

/// Which client implementation a host calls for.
pub enum ClientVariant {
    /// Calls cross the native bridge through this port.
    Bridged(Arc<dyn MessagePort>),
    /// Calls go straight to a locally embedded SDK.
    Direct,
}

impl ClientVariant {
    pub fn is_bridged(&self) -> bool {
        matches!(self, ClientVariant::Bridged(_))
    }
}

impl std::fmt::Debug for ClientVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientVariant::Bridged(_) => f.write_str("Bridged"),
            ClientVariant::Direct => f.write_str("Direct"),
        }
    }
}

/// Inspect the host once and pick the client variant.
///
/// Both the injected bridge object and the readiness marker are required;
/// some platforms expose a partial bridge object without the marker.
pub fn select(host: &dyn HostContext) -> ClientVariant {
    let variant = match host.bridge_port() {
        Some(port) if host.is_injected() => ClientVariant::Bridged(port),
        _ => ClientVariant::Direct,
    };
    info!(platform = host.platform_name(), ?variant, "selected client variant");
    variant
}
