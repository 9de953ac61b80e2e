// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hackle WebView — Core types, configuration, and error definitions shared
// across all crates.

pub mod config;
pub mod decision;
pub mod error;
pub mod types;

pub use config::{ClientConfig, InitializeOptions, WebViewConfig};
pub use decision::*;
pub use error::BridgeError;
pub use types::*;
