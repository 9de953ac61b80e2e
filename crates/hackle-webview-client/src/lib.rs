// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hackle WebView — client facade.
//
// `HackleManager` inspects the host once and returns a `HackleClient`: either
// the bridged `WebViewClient`, whose calls cross the native message channel,
// or the `DirectClient`, which calls an embedded SDK in-process.

pub mod client;
pub mod direct;
pub mod emitter;
pub mod listeners;
pub mod manager;
pub mod remote_config;
pub mod sdk;
pub mod webview;

pub use client::HackleClient;
pub use direct::DirectClient;
pub use emitter::{ClientEvent, Emitter, ListenerHandle};
pub use listeners::{AppEngagementListener, AppPageListener, EngagementListener, PageListener};
pub use manager::HackleManager;
pub use remote_config::WebViewRemoteConfig;
pub use sdk::{BoxFuture, EmbeddedSdk, LocalSdk};
pub use webview::WebViewClient;
