// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client Facade: one operation surface over both client variants.

use serde_json::{Map, Value};
use tokio::sync::broadcast;

use hackle_webview_core::config::InitializeOptions;
use hackle_webview_core::decision::{Decision, FeatureFlagDecision};
use hackle_webview_core::error::Result;
use hackle_webview_core::types::{
    HackleEvent, InAppMessageView, PageView, PropertyOperations, SubscriptionOperations, User,
};

use crate::direct::DirectClient;
use crate::emitter::{ClientEvent, Emitter, ListenerHandle};
use crate::listeners::{AppEngagementListener, AppPageListener};
use crate::remote_config::WebViewRemoteConfig;
use crate::webview::WebViewClient;

/// Route one call to whichever variant this client is.
macro_rules! dispatch {
    ($self:ident, $client:ident => $call:expr) => {
        match $self {
            HackleClient::WebView($client) => $call,
            HackleClient::Direct($client) => $call,
        }
    };
}

/// A Hackle client. The variant is fixed at construction.
pub enum HackleClient {
    WebView(WebViewClient),
    Direct(DirectClient),
}

impl HackleClient {
    pub fn is_bridged(&self) -> bool {
        matches!(self, HackleClient::WebView(_))
    }

    fn emitter(&self) -> &Emitter {
        dispatch!(self, c => c.emitter())
    }

    /// Register a `user-updated` callback.
    pub fn on(&self, handler: impl Fn(ClientEvent) + Send + Sync + 'static) -> ListenerHandle {
        self.emitter().on(handler)
    }

    pub fn off(&self, handle: ListenerHandle) -> bool {
        self.emitter().off(handle)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.emitter().subscribe()
    }

    pub async fn on_initialized(&self, options: InitializeOptions) -> Result<()> {
        dispatch!(self, c => c.on_initialized(options).await)
    }

    pub async fn session_id(&self) -> String {
        dispatch!(self, c => c.session_id().await)
    }

    pub async fn user(&self) -> User {
        dispatch!(self, c => c.user().await)
    }

    pub async fn set_user(&self, user: &User) {
        dispatch!(self, c => c.set_user(user).await)
    }

    pub async fn set_user_id(&self, user_id: Option<&str>) {
        dispatch!(self, c => c.set_user_id(user_id).await)
    }

    pub async fn set_device_id(&self, device_id: &str) {
        dispatch!(self, c => c.set_device_id(device_id).await)
    }

    pub async fn set_user_property(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        dispatch!(self, c => c.set_user_property(key, value).await)
    }

    pub async fn set_user_properties(&self, properties: Map<String, Value>) {
        dispatch!(self, c => c.set_user_properties(properties).await)
    }

    pub async fn update_user_properties(&self, operations: &PropertyOperations) {
        dispatch!(self, c => c.update_user_properties(operations).await)
    }

    pub async fn update_push_subscriptions(&self, operations: &SubscriptionOperations) {
        dispatch!(self, c => c.update_push_subscriptions(operations).await)
    }

    pub async fn update_sms_subscriptions(&self, operations: &SubscriptionOperations) {
        dispatch!(self, c => c.update_sms_subscriptions(operations).await)
    }

    pub async fn update_kakao_subscriptions(&self, operations: &SubscriptionOperations) {
        dispatch!(self, c => c.update_kakao_subscriptions(operations).await)
    }

    pub async fn set_phone_number(&self, phone_number: &str) {
        dispatch!(self, c => c.set_phone_number(phone_number).await)
    }

    pub async fn unset_phone_number(&self) {
        dispatch!(self, c => c.unset_phone_number().await)
    }

    pub async fn reset_user(&self) {
        dispatch!(self, c => c.reset_user().await)
    }

    pub async fn variation(&self, experiment_key: i64) -> String {
        dispatch!(self, c => c.variation(experiment_key).await)
    }

    pub async fn variation_detail(&self, experiment_key: i64) -> Decision {
        dispatch!(self, c => c.variation_detail(experiment_key).await)
    }

    pub async fn is_feature_on(&self, feature_key: i64) -> bool {
        dispatch!(self, c => c.is_feature_on(feature_key).await)
    }

    pub async fn feature_flag_detail(&self, feature_key: i64) -> FeatureFlagDecision {
        dispatch!(self, c => c.feature_flag_detail(feature_key).await)
    }

    pub fn remote_config(&self) -> WebViewRemoteConfig {
        dispatch!(self, c => c.remote_config())
    }

    pub async fn track(&self, event: &HackleEvent) {
        dispatch!(self, c => c.track(event).await)
    }

    pub async fn track_page_view(&self, page_view: Option<&PageView>) {
        dispatch!(self, c => c.track_page_view(page_view).await)
    }

    pub async fn displayed_in_app_message(&self) -> Option<InAppMessageView> {
        dispatch!(self, c => c.displayed_in_app_message().await)
    }

    pub async fn show_user_explorer(&self) {
        dispatch!(self, c => c.show_user_explorer().await)
    }

    pub async fn hide_user_explorer(&self) {
        dispatch!(self, c => c.hide_user_explorer().await)
    }

    pub async fn fetch(&self) {
        dispatch!(self, c => c.fetch().await)
    }

    /// Automatic page-view listener; bridged clients only, when enabled.
    pub fn page_listener(&self) -> Option<AppPageListener> {
        match self {
            HackleClient::WebView(client) => client.page_listener(),
            HackleClient::Direct(_) => None,
        }
    }

    /// Automatic engagement listener; bridged clients only, when enabled.
    pub fn engagement_listener(&self) -> Option<AppEngagementListener> {
        match self {
            HackleClient::WebView(client) => client.engagement_listener(),
            HackleClient::Direct(_) => None,
        }
    }

    /// Tear down. The bridged variant releases its channel listener and
    /// settles every pending call with its fallback. Idempotent.
    pub fn close(&self) {
        if let HackleClient::WebView(client) = self {
            client.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hackle_webview_bridge::{HostContext, MemoryHost, Transceiver};
    use hackle_webview_core::config::{ClientConfig, WebViewConfig};
    use hackle_webview_protocol::Envelope;

    use crate::sdk::LocalSdk;

    fn bridged(host: &MemoryHost) -> HackleClient {
        let port = host.bridge_port().unwrap();
        HackleClient::WebView(WebViewClient::new(
            Transceiver::new(Arc::new(host.clone()), port),
            &ClientConfig::default(),
            WebViewConfig::default(),
        ))
    }

    #[tokio::test]
    async fn subscriber_sees_one_update_per_mutation() {
        let host = MemoryHost::injected(|raw| {
            let request = Envelope::decode(raw)?;
            Envelope::new(request.id, request.kind, Value::Null).encode().ok()
        });
        let client = bridged(&host);
        let mut events = client.subscribe();

        client.set_user_id(Some("abc")).await;

        assert_eq!(events.recv().await.unwrap(), ClientEvent::UserUpdated);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn off_stops_callbacks() {
        let client = HackleClient::Direct(DirectClient::new(
            Arc::new(LocalSdk::new("s")),
            &ClientConfig::default(),
        ));
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = client.on(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        client.reset_user().await;
        assert!(client.off(handle));
        client.reset_user().await;
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn direct_variant_has_no_tracking_listeners() {
        let client = HackleClient::Direct(DirectClient::new(
            Arc::new(LocalSdk::new("s")),
            &ClientConfig::default(),
        ));
        assert!(!client.is_bridged());
        assert!(client.page_listener().is_none());
        assert!(client.engagement_listener().is_none());
        client.close();
    }

    #[tokio::test(start_paused = true)]
    async fn close_settles_pending_reads_with_defaults() {
        let host = MemoryHost::injected(|_| None);
        let client = Arc::new(bridged(&host));

        let waiter = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.variation(1).await })
        };
        while host.sent_messages().is_empty() {
            tokio::task::yield_now().await;
        }

        client.close();
        assert_eq!(waiter.await.unwrap(), "A");
        assert_eq!(host.listener_count(), 0);
    }
}
