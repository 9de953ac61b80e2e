// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Direct client: calls go straight to the locally embedded SDK.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use hackle_webview_core::config::{ClientConfig, InitializeOptions};
use hackle_webview_core::decision::{Decision, FeatureFlagDecision};
use hackle_webview_core::error::{BridgeError, Result};
use hackle_webview_core::types::{
    HackleEvent, InAppMessageView, PageView, PropertyOperations, SubscriptionOperations, User,
};

use crate::emitter::{ClientEvent, Emitter};
use crate::remote_config::WebViewRemoteConfig;
use crate::sdk::EmbeddedSdk;

/// Client backed by an in-page SDK instance.
pub struct DirectClient {
    sdk: Arc<dyn EmbeddedSdk>,
    emitter: Emitter,
    initialize_timeout: Duration,
}

impl DirectClient {
    pub fn new(sdk: Arc<dyn EmbeddedSdk>, config: &ClientConfig) -> Self {
        Self {
            sdk,
            emitter: Emitter::new(),
            initialize_timeout: config.initialize_timeout(),
        }
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn sdk(&self) -> &Arc<dyn EmbeddedSdk> {
        &self.sdk
    }

    /// Wait for the SDK to become ready, bounded by the option's timeout or
    /// the configured default.
    pub async fn on_initialized(&self, options: InitializeOptions) -> Result<()> {
        let timeout = options.timeout.unwrap_or(self.initialize_timeout);
        match tokio::time::timeout(timeout, self.sdk.on_initialized()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "embedded sdk not ready in time");
                Err(BridgeError::Initialization(format!(
                    "sdk not ready after {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    pub async fn session_id(&self) -> String {
        self.sdk.session_id()
    }

    pub async fn user(&self) -> User {
        self.sdk.user()
    }

    pub async fn set_user(&self, user: &User) {
        self.sdk.set_user(user.clone());
        self.user_updated();
    }

    pub async fn set_user_id(&self, user_id: Option<&str>) {
        self.sdk.set_user_id(user_id.map(str::to_owned));
        self.user_updated();
    }

    pub async fn set_device_id(&self, device_id: &str) {
        self.sdk.set_device_id(device_id.to_owned());
        self.user_updated();
    }

    pub async fn set_user_property(&self, key: &str, value: Value) {
        self.sdk.set_user_property(key, value);
        self.user_updated();
    }

    pub async fn set_user_properties(&self, properties: Map<String, Value>) {
        self.sdk.set_user_properties(properties);
        self.user_updated();
    }

    pub async fn update_user_properties(&self, operations: &PropertyOperations) {
        self.sdk.update_user_properties(operations);
        self.user_updated();
    }

    pub async fn update_push_subscriptions(&self, operations: &SubscriptionOperations) {
        self.sdk.update_push_subscriptions(operations);
        self.user_updated();
    }

    pub async fn update_sms_subscriptions(&self, operations: &SubscriptionOperations) {
        self.sdk.update_sms_subscriptions(operations);
        self.user_updated();
    }

    pub async fn update_kakao_subscriptions(&self, operations: &SubscriptionOperations) {
        self.sdk.update_kakao_subscriptions(operations);
        self.user_updated();
    }

    pub async fn set_phone_number(&self, phone_number: &str) {
        self.sdk.set_phone_number(phone_number.to_owned());
    }

    pub async fn unset_phone_number(&self) {
        self.sdk.unset_phone_number();
    }

    pub async fn reset_user(&self) {
        self.sdk.reset_user();
        self.user_updated();
    }

    pub async fn variation(&self, experiment_key: i64) -> String {
        self.sdk.variation(experiment_key)
    }

    pub async fn variation_detail(&self, experiment_key: i64) -> Decision {
        self.sdk.variation_detail(experiment_key)
    }

    pub async fn is_feature_on(&self, feature_key: i64) -> bool {
        self.sdk.is_feature_on(feature_key)
    }

    pub async fn feature_flag_detail(&self, feature_key: i64) -> FeatureFlagDecision {
        self.sdk.feature_flag_detail(feature_key)
    }

    pub fn remote_config(&self) -> WebViewRemoteConfig {
        WebViewRemoteConfig::direct(Arc::clone(&self.sdk))
    }

    pub async fn track(&self, event: &HackleEvent) {
        self.sdk.track(event);
    }

    pub async fn track_page_view(&self, page_view: Option<&PageView>) {
        self.sdk.track_page_view(page_view);
    }

    pub async fn displayed_in_app_message(&self) -> Option<InAppMessageView> {
        self.sdk.displayed_in_app_message()
    }

    pub async fn show_user_explorer(&self) {
        self.sdk.show_user_explorer();
    }

    pub async fn hide_user_explorer(&self) {
        self.sdk.hide_user_explorer();
    }

    pub async fn fetch(&self) {
        self.sdk.fetch().await;
    }

    fn user_updated(&self) {
        debug!("direct client identity changed");
        self.emitter.emit(ClientEvent::UserUpdated);
    }
}
