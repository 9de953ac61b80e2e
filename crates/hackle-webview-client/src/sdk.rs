// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contract for the locally embedded SDK used by the direct client, plus an
// in-process implementation for desktop/CI builds, tests, and the demo.
//
// Flag evaluation is not this workspace's concern: `LocalSdk` answers from
// fixed tables and keeps the current user in memory.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::debug;

use hackle_webview_core::decision::{
    DEFAULT_VARIATION, Decision, DecisionReason, FeatureFlagDecision, ParameterValue,
    RemoteConfigValue,
};
use hackle_webview_core::error::Result;
use hackle_webview_core::types::{
    HackleEvent, InAppMessageView, PageView, PropertyOperations, SubscriptionOperations, User,
};

/// Boxed, sendable future returned by the asynchronous SDK calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The embedded analytics/flag SDK the direct client delegates to.
///
/// Everything is synchronous except readiness and fetching, which the SDK
/// performs over the network.
pub trait EmbeddedSdk: Send + Sync {
    fn session_id(&self) -> String;
    fn user(&self) -> User;

    fn set_user(&self, user: User);
    fn set_user_id(&self, user_id: Option<String>);
    fn set_device_id(&self, device_id: String);
    fn set_user_property(&self, key: &str, value: Value);
    fn set_user_properties(&self, properties: Map<String, Value>);
    fn update_user_properties(&self, operations: &PropertyOperations);
    fn update_push_subscriptions(&self, operations: &SubscriptionOperations);
    fn update_sms_subscriptions(&self, operations: &SubscriptionOperations);
    fn update_kakao_subscriptions(&self, operations: &SubscriptionOperations);
    fn set_phone_number(&self, phone_number: String);
    fn unset_phone_number(&self);
    fn reset_user(&self);

    fn variation(&self, experiment_key: i64) -> String;
    fn variation_detail(&self, experiment_key: i64) -> Decision;
    fn is_feature_on(&self, feature_key: i64) -> bool;
    fn feature_flag_detail(&self, feature_key: i64) -> FeatureFlagDecision;
    fn remote_config(&self, key: &str, default: &ParameterValue) -> RemoteConfigValue;

    fn track(&self, event: &HackleEvent);
    fn track_page_view(&self, page_view: Option<&PageView>);
    fn displayed_in_app_message(&self) -> Option<InAppMessageView>;

    fn show_user_explorer(&self);
    fn hide_user_explorer(&self);

    /// Refresh workspace data from the server.
    fn fetch(&self) -> BoxFuture<'_, ()>;

    /// Settles once the SDK is ready. May never settle; callers bound it with
    /// a timeout.
    fn on_initialized(&self) -> BoxFuture<'_, Result<()>>;
}

#[derive(Default)]
struct LocalState {
    user: User,
    phone_number: Option<String>,
    subscriptions: BTreeMap<&'static str, Map<String, Value>>,
    events: Vec<HackleEvent>,
    page_views: Vec<Option<PageView>>,
    explorer_visible: bool,
    fetches: usize,
}

/// In-process SDK with fixed decision tables.
pub struct LocalSdk {
    session_id: String,
    ready: bool,
    variations: BTreeMap<i64, String>,
    features: BTreeMap<i64, bool>,
    remote_configs: BTreeMap<String, ParameterValue>,
    state: Mutex<LocalState>,
}

impl LocalSdk {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ready: true,
            variations: BTreeMap::new(),
            features: BTreeMap::new(),
            remote_configs: BTreeMap::new(),
            state: Mutex::new(LocalState::default()),
        }
    }

    /// An SDK whose `on_initialized` never settles.
    pub fn never_ready(session_id: impl Into<String>) -> Self {
        Self {
            ready: false,
            ..Self::new(session_id)
        }
    }

    pub fn with_variation(mut self, experiment_key: i64, variation: impl Into<String>) -> Self {
        self.variations.insert(experiment_key, variation.into());
        self
    }

    pub fn with_feature(mut self, feature_key: i64, is_on: bool) -> Self {
        self.features.insert(feature_key, is_on);
        self
    }

    pub fn with_remote_config(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.remote_configs.insert(key.into(), value.into());
        self
    }

    /// Events tracked so far, oldest first.
    pub fn tracked_events(&self) -> Vec<HackleEvent> {
        self.read(|state| state.events.clone())
    }

    pub fn page_view_count(&self) -> usize {
        self.read(|state| state.page_views.len())
    }

    pub fn phone_number(&self) -> Option<String> {
        self.read(|state| state.phone_number.clone())
    }

    /// Subscription statuses recorded for `channel` ("push", "sms", "kakao").
    pub fn subscriptions(&self, channel: &str) -> Map<String, Value> {
        self.read(|state| state.subscriptions.get(channel).cloned().unwrap_or_default())
    }

    pub fn is_explorer_visible(&self) -> bool {
        self.read(|state| state.explorer_visible)
    }

    pub fn fetch_count(&self) -> usize {
        self.read(|state| state.fetches)
    }

    fn read<T: Default>(&self, f: impl FnOnce(&LocalState) -> T) -> T {
        self.state.lock().map(|state| f(&state)).unwrap_or_default()
    }

    fn write(&self, f: impl FnOnce(&mut LocalState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }

    fn subscribe(&self, channel: &'static str, operations: &SubscriptionOperations) {
        self.write(|state| {
            state
                .subscriptions
                .entry(channel)
                .or_default()
                .extend(operations.to_record());
        });
    }
}

impl EmbeddedSdk for LocalSdk {
    fn session_id(&self) -> String {
        self.session_id.clone()
    }

    fn user(&self) -> User {
        self.read(|state| state.user.clone())
    }

    fn set_user(&self, user: User) {
        self.write(|state| state.user = user);
    }

    fn set_user_id(&self, user_id: Option<String>) {
        self.write(|state| state.user.user_id = user_id);
    }

    fn set_device_id(&self, device_id: String) {
        self.write(|state| state.user.device_id = Some(device_id));
    }

    fn set_user_property(&self, key: &str, value: Value) {
        self.write(|state| {
            state.user.properties.insert(key.to_owned(), value);
        });
    }

    fn set_user_properties(&self, properties: Map<String, Value>) {
        self.write(|state| state.user.properties.extend(properties));
    }

    fn update_user_properties(&self, operations: &PropertyOperations) {
        self.write(|state| apply_operations(&mut state.user.properties, operations));
    }

    fn update_push_subscriptions(&self, operations: &SubscriptionOperations) {
        self.subscribe("push", operations);
    }

    fn update_sms_subscriptions(&self, operations: &SubscriptionOperations) {
        self.subscribe("sms", operations);
    }

    fn update_kakao_subscriptions(&self, operations: &SubscriptionOperations) {
        self.subscribe("kakao", operations);
    }

    fn set_phone_number(&self, phone_number: String) {
        self.write(|state| state.phone_number = Some(phone_number));
    }

    fn unset_phone_number(&self) {
        self.write(|state| state.phone_number = None);
    }

    fn reset_user(&self) {
        self.write(|state| {
            state.user = User::default();
            state.phone_number = None;
        });
    }

    fn variation(&self, experiment_key: i64) -> String {
        self.variation_detail(experiment_key).variation
    }

    fn variation_detail(&self, experiment_key: i64) -> Decision {
        match self.variations.get(&experiment_key) {
            Some(variation) => Decision::of(variation.clone(), DecisionReason::TrafficAllocated),
            None => Decision::of(DEFAULT_VARIATION, DecisionReason::ExperimentNotFound),
        }
    }

    fn is_feature_on(&self, feature_key: i64) -> bool {
        self.feature_flag_detail(feature_key).is_on
    }

    fn feature_flag_detail(&self, feature_key: i64) -> FeatureFlagDecision {
        match self.features.get(&feature_key) {
            Some(true) => FeatureFlagDecision::on(DecisionReason::DefaultRule),
            Some(false) => FeatureFlagDecision::off(DecisionReason::DefaultRule),
            None => FeatureFlagDecision::off(DecisionReason::FeatureFlagNotFound),
        }
    }

    fn remote_config(&self, key: &str, default: &ParameterValue) -> RemoteConfigValue {
        let (value, reason) = match self.remote_configs.get(key) {
            None => (default.clone(), DecisionReason::RemoteConfigParameterNotFound),
            Some(stored) if stored.value_type() == default.value_type() => {
                (stored.clone(), DecisionReason::DefaultRule)
            }
            Some(_) => (default.clone(), DecisionReason::TypeMismatch),
        };
        RemoteConfigValue { value, reason }
    }

    fn track(&self, event: &HackleEvent) {
        debug!(key = %event.key, "local sdk tracked event");
        self.write(|state| state.events.push(event.clone()));
    }

    fn track_page_view(&self, page_view: Option<&PageView>) {
        self.write(|state| state.page_views.push(page_view.cloned()));
    }

    fn displayed_in_app_message(&self) -> Option<InAppMessageView> {
        None
    }

    fn show_user_explorer(&self) {
        self.write(|state| state.explorer_visible = true);
    }

    fn hide_user_explorer(&self) {
        self.write(|state| state.explorer_visible = false);
    }

    fn fetch(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.write(|state| state.fetches += 1);
        })
    }

    fn on_initialized(&self) -> BoxFuture<'_, Result<()>> {
        let ready = self.ready;
        Box::pin(async move {
            if !ready {
                std::future::pending::<()>().await;
            }
            Ok(())
        })
    }
}

/// Apply `operations` to a property map the way the SDK would.
fn apply_operations(properties: &mut Map<String, Value>, operations: &PropertyOperations) {
    if operations.clear_all {
        properties.clear();
        return;
    }
    for (key, value) in &operations.set {
        properties.insert(key.clone(), value.clone());
    }
    for (key, value) in &operations.set_once {
        properties.entry(key.clone()).or_insert_with(|| value.clone());
    }
    for key in &operations.unset {
        properties.remove(key);
    }
    for (key, by) in &operations.increment {
        let current = properties.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        properties.insert(key.clone(), Value::from(current + by));
    }
    for (key, value) in &operations.append {
        push_values(properties, key, value, false, false);
    }
    for (key, value) in &operations.append_once {
        push_values(properties, key, value, false, true);
    }
    for (key, value) in &operations.prepend {
        push_values(properties, key, value, true, false);
    }
    for (key, value) in &operations.prepend_once {
        push_values(properties, key, value, true, true);
    }
    for (key, value) in &operations.remove {
        if let Some(Value::Array(items)) = properties.get_mut(key) {
            let removed = as_list(value);
            items.retain(|item| !removed.contains(item));
        }
    }
}

fn push_values(properties: &mut Map<String, Value>, key: &str, value: &Value, front: bool, once: bool) {
    let slot = properties
        .entry(key.to_owned())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(vec![slot.take()]);
    }
    let Value::Array(items) = slot else {
        return;
    };
    for value in as_list(value) {
        if once && items.contains(&value) {
            continue;
        }
        if front {
            items.insert(0, value);
        } else {
            items.push(value);
        }
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
