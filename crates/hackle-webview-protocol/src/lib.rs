// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hackle WebView — wire protocol.
//
// Envelope codec, the correlation registry that pairs replies with requests,
// the command catalog with its timeout policies, and the invocation engine
// that ties them together over a `Transceiver`.

pub mod commands;
pub mod invocator;
pub mod message;
pub mod registry;

pub use commands::{Command, CommandPolicy, TimeoutFallback};
pub use invocator::{InvokeOptions, Invocator};
pub use message::{ERROR_TYPE, Envelope, MESSAGE_FIELD_NAME, new_correlation_id};
pub use registry::{CorrelationRegistry, Resolver};
