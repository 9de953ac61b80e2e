// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Automatic page-view and engagement tracking for the bridged client.
//
// The embedded page lifecycle tracker calls these listeners; they forward the
// observations to the native SDK as ordinary `track` commands and ignore the
// outcome.

use std::sync::Arc;

use serde_json::json;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use hackle_webview_bridge::HostContext;
use hackle_webview_core::types::{BrowserProperties, Engagement, HackleEvent, Page};
use hackle_webview_protocol::{Command, Invocator};

pub const PAGE_VIEW_EVENT_KEY: &str = "$page_view";
pub const PAGE_NAME_PROPERTY_KEY: &str = "$page_name";
pub const ENGAGEMENT_EVENT_KEY: &str = "$engagement";
pub const ENGAGEMENT_TIME_PROPERTY_KEY: &str = "$engagement_time_ms";

/// Observer of page transitions.
pub trait PageListener: Send + Sync {
    fn on_page_started(&self, page: &Page);
    fn on_page_ended(&self, page: &Page);
}

/// Observer of time spent on a page.
pub trait EngagementListener: Send + Sync {
    fn on_engagement(&self, engagement: &Engagement);
}

/// Sends `$page_view` whenever a page starts.
pub struct AppPageListener {
    invocator: Arc<Invocator>,
}

impl AppPageListener {
    pub(crate) fn new(invocator: Arc<Invocator>) -> Self {
        Self { invocator }
    }

    /// Send the page view; the handle resolves once the invocation settles.
    pub fn track(&self, page: &Page) -> Option<JoinHandle<()>> {
        let event = HackleEvent::new(PAGE_VIEW_EVENT_KEY)
            .with_property(PAGE_NAME_PROPERTY_KEY, page.title.clone());
        send_track(&self.invocator, event, None)
    }
}

impl PageListener for AppPageListener {
    fn on_page_started(&self, page: &Page) {
        self.track(page);
    }

    fn on_page_ended(&self, _page: &Page) {}
}

/// Sends `$engagement` with the engaged page's own browser properties.
pub struct AppEngagementListener {
    invocator: Arc<Invocator>,
}

impl AppEngagementListener {
    pub(crate) fn new(invocator: Arc<Invocator>) -> Self {
        Self { invocator }
    }

    pub fn track(&self, engagement: &Engagement) -> Option<JoinHandle<()>> {
        let event = HackleEvent::new(ENGAGEMENT_EVENT_KEY)
            .with_property(PAGE_NAME_PROPERTY_KEY, engagement.page.title.clone())
            .with_property(ENGAGEMENT_TIME_PROPERTY_KEY, engagement.duration_millis);
        let properties = self
            .invocator
            .transceiver()
            .host()
            .browser_properties_for(&engagement.page);
        send_track(&self.invocator, event, Some(properties))
    }
}

impl EngagementListener for AppEngagementListener {
    fn on_engagement(&self, engagement: &Engagement) {
        self.track(engagement);
    }
}

fn send_track(
    invocator: &Arc<Invocator>,
    event: HackleEvent,
    properties: Option<BrowserProperties>,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = Handle::try_current() else {
        warn!(key = %event.key, "no async runtime; dropping automatic tracking event");
        return None;
    };
    let invocator = Arc::clone(invocator);
    Some(runtime.spawn(async move {
        let mut options = invocator.options_for(Command::Track);
        if let Some(properties) = properties {
            options = options.with_browser_properties(properties);
        }
        let payload = json!({ "event": event });
        match invocator.invoke(Command::Track.as_str(), payload, options).await {
            Ok(_) => debug!(key = %event.key, "automatic tracking event sent"),
            Err(e) => debug!(key = %event.key, error = %e, "automatic tracking event ignored"),
        }
    }))
}
