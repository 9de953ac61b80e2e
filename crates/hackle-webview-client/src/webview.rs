// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridged client: every operation is a round trip to the native SDK.
//
// Read commands decode their reply into a small typed schema and fall back to
// the command's default when the reply is missing or malformed. Detail
// commands turn any failure into an exception-tagged decision. Identity
// commands fire `user-updated` once they complete, whatever the outcome.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use hackle_webview_bridge::Transceiver;
use hackle_webview_core::config::{ClientConfig, InitializeOptions, WebViewConfig};
use hackle_webview_core::decision::{
    DEFAULT_VARIATION, Decision, DecisionReason, FeatureFlagDecision, ParameterConfig,
};
use hackle_webview_core::types::{
    HackleEvent, InAppMessageView, PageView, PropertyOperations, SubscriptionOperations, User,
};
use hackle_webview_core::error::Result;
use hackle_webview_protocol::{Command, Invocator, TimeoutFallback};

use crate::emitter::{ClientEvent, Emitter};
use crate::listeners::{AppEngagementListener, AppPageListener};
use crate::remote_config::WebViewRemoteConfig;

// -- Reply schemas ----------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionIdReply {
    session_id: String,
}

#[derive(Deserialize)]
struct UserReply {
    #[serde(default)]
    user: User,
}

#[derive(Deserialize)]
struct VariationReply {
    variation: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IsOnReply {
    is_on: bool,
}

#[derive(Deserialize)]
struct VariationDetailReply {
    variation: String,
    reason: DecisionReason,
    #[serde(default)]
    parameters: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureFlagDetailReply {
    is_on: bool,
    reason: DecisionReason,
    #[serde(default)]
    parameters: Value,
}

/// Client that talks to a native SDK through the WebView bridge.
pub struct WebViewClient {
    invocator: Arc<Invocator>,
    emitter: Emitter,
    webview_config: WebViewConfig,
}

impl WebViewClient {
    pub fn new(transceiver: Transceiver, config: &ClientConfig, webview_config: WebViewConfig) -> Self {
        Self {
            invocator: Arc::new(Invocator::new(transceiver, config)),
            emitter: Emitter::new(),
            webview_config,
        }
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn webview_config(&self) -> WebViewConfig {
        self.webview_config
    }

    /// The bridge has no separate "not ready" state once constructed.
    pub async fn on_initialized(&self, _options: InitializeOptions) -> Result<()> {
        Ok(())
    }

    // -- Identity -----------------------------------------------------------

    pub async fn session_id(&self) -> String {
        self.read::<SessionIdReply>(Command::GetSessionId, Value::Null)
            .await
            .map(|reply| reply.session_id)
            .unwrap_or_default()
    }

    pub async fn user(&self) -> User {
        self.read::<UserReply>(Command::GetUser, Value::Null)
            .await
            .map(|reply| reply.user)
            .unwrap_or_default()
    }

    pub async fn set_user(&self, user: &User) {
        self.send(Command::SetUser, json!({ "user": user })).await;
    }

    pub async fn set_user_id(&self, user_id: Option<&str>) {
        self.send(Command::SetUserId, json!({ "userId": user_id })).await;
    }

    pub async fn set_device_id(&self, device_id: &str) {
        self.send(Command::SetDeviceId, json!({ "deviceId": device_id }))
            .await;
    }

    pub async fn set_user_property(&self, key: &str, value: Value) {
        self.send(Command::SetUserProperty, json!({ "key": key, "value": value }))
            .await;
    }

    pub async fn set_user_properties(&self, properties: Map<String, Value>) {
        self.send(Command::SetUserProperties, json!({ "properties": properties }))
            .await;
    }

    pub async fn update_user_properties(&self, operations: &PropertyOperations) {
        self.send(
            Command::UpdateUserProperties,
            json!({ "operations": operations.to_record() }),
        )
        .await;
    }

    pub async fn update_push_subscriptions(&self, operations: &SubscriptionOperations) {
        self.send(
            Command::UpdatePushSubscriptions,
            json!({ "operations": operations.to_record() }),
        )
        .await;
    }

    pub async fn update_sms_subscriptions(&self, operations: &SubscriptionOperations) {
        self.send(
            Command::UpdateSmsSubscriptions,
            json!({ "operations": operations.to_record() }),
        )
        .await;
    }

    pub async fn update_kakao_subscriptions(&self, operations: &SubscriptionOperations) {
        self.send(
            Command::UpdateKakaoSubscriptions,
            json!({ "operations": operations.to_record() }),
        )
        .await;
    }

    pub async fn set_phone_number(&self, phone_number: &str) {
        self.send(Command::SetPhoneNumber, json!({ "phoneNumber": phone_number }))
            .await;
    }

    pub async fn unset_phone_number(&self) {
        self.send(Command::UnsetPhoneNumber, Value::Null).await;
    }

    pub async fn reset_user(&self) {
        self.send(Command::ResetUser, Value::Null).await;
    }

    // -- Decisions ----------------------------------------------------------

    pub async fn variation(&self, experiment_key: i64) -> String {
        self.read::<VariationReply>(Command::Variation, json!({ "experimentKey": experiment_key }))
            .await
            .map(|reply| reply.variation)
            .unwrap_or_else(|| DEFAULT_VARIATION.to_owned())
    }

    pub async fn variation_detail(&self, experiment_key: i64) -> Decision {
        let payload = json!({ "experimentKey": experiment_key });
        match self
            .detail::<VariationDetailReply>(Command::VariationDetail, payload)
            .await
        {
            Some(reply) => Decision {
                variation: reply.variation,
                reason: reply.reason,
                parameters: ParameterConfig::from_json(&reply.parameters),
            },
            None => Decision::exception(),
        }
    }

    pub async fn is_feature_on(&self, feature_key: i64) -> bool {
        self.read::<IsOnReply>(Command::IsFeatureOn, json!({ "featureKey": feature_key }))
            .await
            .is_some_and(|reply| reply.is_on)
    }

    pub async fn feature_flag_detail(&self, feature_key: i64) -> FeatureFlagDecision {
        let payload = json!({ "featureKey": feature_key });
        match self
            .detail::<FeatureFlagDetailReply>(Command::FeatureFlagDetail, payload)
            .await
        {
            Some(reply) => FeatureFlagDecision {
                is_on: reply.is_on,
                reason: reply.reason,
                parameters: ParameterConfig::from_json(&reply.parameters),
            },
            None => FeatureFlagDecision::off(DecisionReason::Exception),
        }
    }

    pub fn remote_config(&self) -> WebViewRemoteConfig {
        WebViewRemoteConfig::bridged(Arc::clone(&self.invocator))
    }

    // -- Tracking -----------------------------------------------------------

    pub async fn track(&self, event: &HackleEvent) {
        self.send(Command::Track, json!({ "event": event })).await;
    }

    /// Page views are tracked by the native shell in this variant.
    pub async fn track_page_view(&self, _page_view: Option<&PageView>) {
        debug!("track_page_view is not supported through the bridge");
    }

    pub async fn displayed_in_app_message(&self) -> Option<InAppMessageView> {
        debug!("displayed_in_app_message is not supported through the bridge");
        None
    }

    /// Listener for automatic screen tracking, when the host enabled it.
    pub fn page_listener(&self) -> Option<AppPageListener> {
        self.webview_config
            .automatic_screen_tracking
            .then(|| AppPageListener::new(Arc::clone(&self.invocator)))
    }

    /// Listener for automatic engagement tracking, when the host enabled it.
    pub fn engagement_listener(&self) -> Option<AppEngagementListener> {
        self.webview_config
            .automatic_engagement_tracking
            .then(|| AppEngagementListener::new(Arc::clone(&self.invocator)))
    }

    // -- Misc ---------------------------------------------------------------

    pub async fn show_user_explorer(&self) {
        self.send(Command::ShowUserExplorer, Value::Null).await;
    }

    pub async fn hide_user_explorer(&self) {
        self.send(Command::HideUserExplorer, Value::Null).await;
    }

    pub async fn fetch(&self) {
        self.send(Command::Fetch, Value::Null).await;
    }

    pub fn pending_count(&self) -> usize {
        self.invocator.pending_count()
    }

    /// Release the bridge listener and settle pending calls with fallbacks.
    pub fn close(&self) {
        self.invocator.close();
    }

    // -- Plumbing -----------------------------------------------------------

    /// Fire a command whose reply carries nothing, then emit `user-updated`
    /// if the command changes identity.
    async fn send(&self, command: Command, payload: Value) {
        if let Err(e) = self.invocator.invoke_command(command, payload).await {
            warn!(%command, error = %e, "bridge command failed");
        }
        if command.policy().mutates_user {
            self.emitter.emit(ClientEvent::UserUpdated);
        }
    }

    /// Invoke a read command and decode its reply, falling back to the
    /// command's timeout default on failure or on an unexpected shape.
    async fn read<T: DeserializeOwned>(&self, command: Command, payload: Value) -> Option<T> {
        let reply = match self.invocator.invoke_command(command, payload).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%command, error = %e, "bridge command failed; using default");
                return fallback_reply(command);
            }
        };
        match serde_json::from_value(reply) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(%command, error = %e, "malformed reply; using default");
                fallback_reply(command)
            }
        }
    }

    /// Invoke a detail command. `None` means the caller must synthesize an
    /// exception-tagged result.
    async fn detail<T: DeserializeOwned>(&self, command: Command, payload: Value) -> Option<T> {
        let reply = match self.invocator.invoke_command(command, payload).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%command, error = %e, "no decision from native sdk");
                return None;
            }
        };
        serde_json::from_value(reply)
            .map_err(|e| warn!(%command, error = %e, "malformed decision reply"))
            .ok()
    }
}

fn fallback_reply<T: DeserializeOwned>(command: Command) -> Option<T> {
    match command.policy().on_timeout {
        TimeoutFallback::Resolve(value) => serde_json::from_value(value).ok(),
        TimeoutFallback::Reject => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hackle_webview_bridge::{HostContext, MemoryHost};
    use hackle_webview_protocol::Envelope;

    /// Native side answering each command through `answer`.
    fn host_with(answer: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static) -> MemoryHost {
        MemoryHost::injected(move |raw| {
            let request = Envelope::decode(raw)?;
            let payload = answer(&request.kind, &request.payload)?;
            Envelope::new(request.id, request.kind, payload).encode().ok()
        })
    }

    fn client(host: &MemoryHost, webview_config: WebViewConfig) -> WebViewClient {
        let port = host.bridge_port().unwrap();
        WebViewClient::new(
            Transceiver::new(Arc::new(host.clone()), port),
            &ClientConfig::default(),
            webview_config,
        )
    }

    fn silent() -> MemoryHost {
        MemoryHost::injected(|_| None)
    }

    fn count_updates(client: &WebViewClient) -> Arc<AtomicUsize> {
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        client.emitter().on(move |event| {
            assert_eq!(event, ClientEvent::UserUpdated);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        updates
    }

    #[tokio::test]
    async fn set_user_id_emits_exactly_once() {
        let host = host_with(|_, _| Some(Value::Null));
        let client = client(&host, WebViewConfig::default());
        let updates = count_updates(&client);

        client.set_user_id(Some("abc")).await;

        assert_eq!(updates.load(Ordering::SeqCst), 1);
        let request = Envelope::decode(&host.sent_messages()[0]).unwrap();
        assert_eq!(request.kind, "setUserId");
        assert_eq!(request.payload, json!({"userId": "abc"}));
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_emits_even_after_timeout() {
        let host = silent();
        let client = client(&host, WebViewConfig::default());
        let updates = count_updates(&client);

        client.reset_user().await;
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn phone_number_and_tracking_do_not_emit() {
        let host = host_with(|_, _| Some(Value::Null));
        let client = client(&host, WebViewConfig::default());
        let updates = count_updates(&client);

        client.set_phone_number("+821012345678").await;
        client.unset_phone_number().await;
        client.track(&HackleEvent::new("purchase")).await;
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn replies_decode_into_results() {
        let host = host_with(|kind, payload| match kind {
            "getSessionId" => Some(json!({"sessionId": "s-42"})),
            "getUser" => Some(json!({"user": {"userId": "abc"}})),
            "variation" => Some(json!({"variation": format!("V{}", payload["experimentKey"])})),
            "isFeatureOn" => Some(json!({"isOn": true})),
            _ => None,
        });
        let client = client(&host, WebViewConfig::default());

        assert_eq!(client.session_id().await, "s-42");
        assert_eq!(client.user().await, User::with_user_id("abc"));
        assert_eq!(client.variation(7).await, "V7");
        assert!(client.is_feature_on(3).await);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_bridge_falls_back_to_defaults() {
        let client = client(&silent(), WebViewConfig::default());

        assert_eq!(client.variation(1).await, "A");
        assert!(!client.is_feature_on(1).await);
        assert_eq!(client.session_id().await, "");
        assert_eq!(client.user().await, User::default());
    }

    #[tokio::test(start_paused = true)]
    async fn detail_commands_are_tagged_exception_on_timeout() {
        let client = client(&silent(), WebViewConfig::default());

        let decision = client.variation_detail(1).await;
        assert_eq!(decision.variation, "A");
        assert_eq!(decision.reason, DecisionReason::Exception);

        let flag = client.feature_flag_detail(1).await;
        assert!(!flag.is_on);
        assert_eq!(flag.reason, DecisionReason::Exception);
    }

    #[tokio::test]
    async fn detail_reply_keeps_reason_and_parameters() {
        let host = host_with(|kind, _| match kind {
            "variationDetail" => Some(json!({
                "variation": "B",
                "reason": "TRAFFIC_ALLOCATED",
                "parameters": {"color": "red", "size": 3},
            })),
            "featureFlagDetail" => Some(json!({
                "isOn": true,
                "reason": "TARGET_RULE_MATCH",
            })),
            _ => None,
        });
        let client = client(&host, WebViewConfig::default());

        let decision = client.variation_detail(1).await;
        assert_eq!(decision.variation, "B");
        assert_eq!(decision.reason, DecisionReason::TrafficAllocated);
        assert_eq!(decision.parameters.get_string("color", "blue"), "red");
        assert_eq!(decision.parameters.get_number("size", 0.0), 3.0);

        let flag = client.feature_flag_detail(2).await;
        assert!(flag.is_on);
        assert_eq!(flag.reason, DecisionReason::TargetRuleMatch);
        assert!(flag.parameters.is_empty());
    }

    #[tokio::test]
    async fn malformed_replies_degrade_gracefully() {
        let host = host_with(|kind, _| match kind {
            "variation" => Some(json!({"variation": 12})),
            "variationDetail" => Some(json!({"variation": "B"})),
            _ => Some(json!("garbage")),
        });
        let client = client(&host, WebViewConfig::default());

        assert_eq!(client.variation(1).await, "A");
        assert!(!client.is_feature_on(1).await);
        assert_eq!(client.variation_detail(1).await, Decision::exception());
    }

    #[tokio::test]
    async fn error_reply_falls_back() {
        let host = MemoryHost::injected(|raw| {
            let request = Envelope::decode(raw)?;
            Envelope::new(request.id, "error", json!("not initialized"))
                .encode()
                .ok()
        });
        let client = client(&host, WebViewConfig::default());

        assert_eq!(client.variation(1).await, "A");
        assert_eq!(
            client.feature_flag_detail(1).await,
            FeatureFlagDecision::off(DecisionReason::Exception)
        );
    }

    #[tokio::test]
    async fn operation_payloads_use_wire_records() {
        let host = host_with(|_, _| Some(Value::Null));
        let client = client(&host, WebViewConfig::default());

        let mut operations = PropertyOperations::default();
        operations.set.insert("grade".into(), json!("gold"));
        operations.unset.push("coupon".into());
        client.update_user_properties(&operations).await;

        let subscriptions = SubscriptionOperations {
            marketing: Some(hackle_webview_core::types::SubscriptionStatus::Subscribed),
            ..SubscriptionOperations::default()
        };
        client.update_push_subscriptions(&subscriptions).await;

        let sent: Vec<Envelope> = host
            .sent_messages()
            .iter()
            .filter_map(|raw| Envelope::decode(raw))
            .collect();
        assert_eq!(
            sent[0].payload,
            json!({"operations": {"$set": {"grade": "gold"}, "$unset": {"coupon": "-"}}})
        );
        assert_eq!(sent[1].kind, "updatePushSubscriptions");
        assert_eq!(sent[1].payload, json!({"operations": {"$marketing": "SUBSCRIBED"}}));
    }

    #[tokio::test]
    async fn unsupported_operations_are_local() {
        let host = silent();
        let client = client(&host, WebViewConfig::default());

        client.track_page_view(None).await;
        assert!(client.displayed_in_app_message().await.is_none());
        assert!(host.sent_messages().is_empty());
        assert!(client.on_initialized(InitializeOptions::default()).await.is_ok());
    }

    #[test]
    fn tracking_listeners_follow_webview_config() {
        let host = silent();
        let disabled = client(&host, WebViewConfig::default());
        assert!(disabled.page_listener().is_none());
        assert!(disabled.engagement_listener().is_none());

        let enabled = client(
            &host,
            WebViewConfig {
                automatic_screen_tracking: true,
                automatic_engagement_tracking: false,
            },
        );
        assert!(enabled.page_listener().is_some());
        assert!(enabled.engagement_listener().is_none());
    }

    #[tokio::test]
    async fn close_releases_listener() {
        let host = silent();
        let client = client(&host, WebViewConfig::default());
        assert_eq!(host.listener_count(), 1);
        client.close();
        client.close();
        assert_eq!(host.listener_count(), 0);
    }
}
