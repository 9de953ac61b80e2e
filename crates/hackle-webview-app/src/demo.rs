// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Walk one client through the whole facade and report what it saw.

use chrono::Utc;
use tracing::info;

use hackle_webview_client::{EngagementListener, HackleClient, PageListener};
use hackle_webview_core::config::InitializeOptions;
use hackle_webview_core::types::{
    Engagement, HackleEvent, Page, PropertyOperations, SubscriptionOperations, SubscriptionStatus,
};

pub const EXPERIMENT_KEY: i64 = 42;
pub const FEATURE_KEY: i64 = 7;

/// What the demo observed, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub bridged: bool,
    pub session_id: String,
    pub user_id: Option<String>,
    pub variation: String,
    pub feature_on: bool,
    pub banner: String,
    pub user_updates: usize,
}

pub async fn run(client: &HackleClient) -> Report {
    let mut updates = client.subscribe();

    if let Err(e) = client.on_initialized(InitializeOptions::default()).await {
        tracing::warn!(error = %e, "client did not initialize; continuing with fallbacks");
    }

    let session_id = client.session_id().await;
    info!(%session_id, bridged = client.is_bridged(), "session");

    client.set_user_id(Some("demo-user")).await;
    client.set_user_property("plan", "premium").await;

    let mut operations = PropertyOperations::default();
    operations.increment.insert("visits".into(), 1.0);
    client.update_user_properties(&operations).await;

    client
        .update_push_subscriptions(&SubscriptionOperations {
            marketing: Some(SubscriptionStatus::Subscribed),
            ..SubscriptionOperations::default()
        })
        .await;

    let user = client.user().await;
    info!(user_id = ?user.user_id, properties = user.properties.len(), "current user");

    let variation = client.variation(EXPERIMENT_KEY).await;
    let detail = client.variation_detail(EXPERIMENT_KEY).await;
    info!(%variation, reason = ?detail.reason, "experiment");

    let feature_on = client.is_feature_on(FEATURE_KEY).await;
    let flag = client.feature_flag_detail(FEATURE_KEY).await;
    info!(feature_on, reason = ?flag.reason, "feature flag");

    let banner = client
        .remote_config()
        .get_string("banner", "Welcome")
        .await;
    info!(%banner, "remote config");

    client
        .track(&HackleEvent::new("purchase").with_property("amount", 19.9))
        .await;
    client.track_page_view(None).await;

    let page = Page {
        title: "Home".into(),
        url: "https://demo.example/".into(),
        entered_at: Utc::now(),
    };
    if let Some(listener) = client.page_listener() {
        listener.on_page_started(&page);
    }
    if let Some(listener) = client.engagement_listener() {
        listener.on_engagement(&Engagement {
            page: page.clone(),
            duration_millis: 2_400,
        });
    }

    let mut user_updates = 0;
    while updates.try_recv().is_ok() {
        user_updates += 1;
    }
    info!(user_updates, "user-updated events observed");

    Report {
        bridged: client.is_bridged(),
        session_id,
        user_id: user.user_id,
        variation,
        feature_on,
        banner,
        user_updates,
    }
}
