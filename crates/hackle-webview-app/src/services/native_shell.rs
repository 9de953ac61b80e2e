// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated native shell.
//
// Plays the mobile app hosting the WebView: decodes each bridge request,
// runs it against an in-process SDK, and answers with a reply envelope using
// the request's correlation id. Unknown commands get an `error` reply.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use hackle_webview_client::{EmbeddedSdk, LocalSdk};
use hackle_webview_core::decision::{ParameterValue, ValueType};
use hackle_webview_core::types::{
    HackleEvent, PropertyOperations, SubscriptionOperations, SubscriptionStatus, User,
};
use hackle_webview_protocol::{Command, ERROR_TYPE, Envelope};

/// Native-side command dispatcher backed by a `LocalSdk`.
pub struct NativeShell {
    sdk: Arc<LocalSdk>,
}

impl NativeShell {
    pub fn new(sdk: Arc<LocalSdk>) -> Self {
        Self { sdk }
    }

    /// Reply to one raw channel message, or `None` if it is not a request.
    pub fn respond(&self, raw: &str) -> Option<String> {
        let request = Envelope::decode(raw)?;
        let reply = match Command::from_wire(&request.kind) {
            Some(command) => {
                debug!(%command, id = %request.id, "native shell handling command");
                Envelope::new(request.id, request.kind, self.handle(command, &request.payload))
            }
            None => {
                warn!(kind = %request.kind, "native shell received unknown command");
                Envelope::new(
                    request.id,
                    ERROR_TYPE,
                    Value::from(format!("unsupported command: {}", request.kind)),
                )
            }
        };
        reply.encode().ok()
    }

    fn handle(&self, command: Command, payload: &Value) -> Value {
        let sdk = &self.sdk;
        match command {
            Command::GetSessionId => json!({ "sessionId": sdk.session_id() }),
            Command::GetUser => json!({ "user": sdk.user() }),
            Command::SetUser => {
                let user: User = serde_json::from_value(payload["user"].clone()).unwrap_or_default();
                sdk.set_user(user);
                Value::Null
            }
            Command::SetUserId => {
                sdk.set_user_id(payload["userId"].as_str().map(str::to_owned));
                Value::Null
            }
            Command::SetDeviceId => {
                if let Some(device_id) = payload["deviceId"].as_str() {
                    sdk.set_device_id(device_id.to_owned());
                }
                Value::Null
            }
            Command::SetUserProperty => {
                if let Some(key) = payload["key"].as_str() {
                    sdk.set_user_property(key, payload["value"].clone());
                }
                Value::Null
            }
            Command::SetUserProperties => {
                if let Some(properties) = payload["properties"].as_object() {
                    sdk.set_user_properties(properties.clone());
                }
                Value::Null
            }
            Command::UpdateUserProperties => {
                sdk.update_user_properties(&property_operations(&payload["operations"]));
                Value::Null
            }
            Command::UpdatePushSubscriptions => {
                sdk.update_push_subscriptions(&subscription_operations(&payload["operations"]));
                Value::Null
            }
            Command::UpdateSmsSubscriptions => {
                sdk.update_sms_subscriptions(&subscription_operations(&payload["operations"]));
                Value::Null
            }
            Command::UpdateKakaoSubscriptions => {
                sdk.update_kakao_subscriptions(&subscription_operations(&payload["operations"]));
                Value::Null
            }
            Command::SetPhoneNumber => {
                if let Some(phone_number) = payload["phoneNumber"].as_str() {
                    sdk.set_phone_number(phone_number.to_owned());
                }
                Value::Null
            }
            Command::UnsetPhoneNumber => {
                sdk.unset_phone_number();
                Value::Null
            }
            Command::ResetUser => {
                sdk.reset_user();
                Value::Null
            }
            Command::Variation => {
                json!({ "variation": sdk.variation(key_of(payload, "experimentKey")) })
            }
            Command::VariationDetail => {
                let decision = sdk.variation_detail(key_of(payload, "experimentKey"));
                json!({
                    "variation": decision.variation,
                    "reason": decision.reason,
                    "parameters": {},
                })
            }
            Command::IsFeatureOn => json!({ "isOn": sdk.is_feature_on(key_of(payload, "featureKey")) }),
            Command::FeatureFlagDetail => {
                let decision = sdk.feature_flag_detail(key_of(payload, "featureKey"));
                json!({
                    "isOn": decision.is_on,
                    "reason": decision.reason,
                    "parameters": {},
                })
            }
            Command::Track => {
                if let Ok(event) = serde_json::from_value::<HackleEvent>(payload["event"].clone()) {
                    sdk.track(&event);
                }
                Value::Null
            }
            Command::RemoteConfig => {
                let key = payload["key"].as_str().unwrap_or_default();
                let value_type = serde_json::from_value(payload["valueType"].clone())
                    .unwrap_or(ValueType::String);
                let default = ParameterValue::coerce(&payload["defaultValue"], value_type)
                    .unwrap_or_else(|| ParameterValue::from(""));
                let detail = sdk.remote_config(key, &default);
                json!({ "configValue": detail.value.to_json(), "reason": detail.reason })
            }
            Command::ShowUserExplorer => {
                sdk.show_user_explorer();
                Value::Null
            }
            Command::HideUserExplorer => {
                sdk.hide_user_explorer();
                Value::Null
            }
            // The local SDK has nothing to fetch synchronously.
            Command::Fetch => Value::Null,
        }
    }
}

fn key_of(payload: &Value, field: &str) -> i64 {
    payload[field].as_i64().unwrap_or_default()
}

fn group(record: &Value, name: &str) -> BTreeMap<String, Value> {
    record[name]
        .as_object()
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// Rebuild operations from their `$`-prefixed wire record.
fn property_operations(record: &Value) -> PropertyOperations {
    PropertyOperations {
        set: group(record, "$set"),
        set_once: group(record, "$setOnce"),
        unset: group(record, "$unset").into_keys().collect(),
        increment: group(record, "$increment")
            .into_iter()
            .filter_map(|(key, by)| by.as_f64().map(|by| (key, by)))
            .collect(),
        append: group(record, "$append"),
        append_once: group(record, "$appendOnce"),
        prepend: group(record, "$prepend"),
        prepend_once: group(record, "$prependOnce"),
        remove: group(record, "$remove"),
        clear_all: record.get("$clearAll").is_some(),
    }
}

fn subscription_operations(record: &Value) -> SubscriptionOperations {
    let mut operations = SubscriptionOperations::default();
    let Some(record) = record.as_object() else {
        return operations;
    };
    for (topic, status) in record {
        let Ok(status) = serde_json::from_value::<SubscriptionStatus>(status.clone()) else {
            continue;
        };
        match topic.as_str() {
            "$marketing" => operations.marketing = Some(status),
            "$information" => operations.information = Some(status),
            _ => {
                operations.custom.insert(topic.clone(), status);
            }
        }
    }
    operations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> (Arc<LocalSdk>, NativeShell) {
        let sdk = Arc::new(
            LocalSdk::new("session-1")
                .with_variation(42, "B")
                .with_feature(7, true)
                .with_remote_config("banner", "Spring sale"),
        );
        (Arc::clone(&sdk), NativeShell::new(sdk))
    }

    fn ask(shell: &NativeShell, kind: &str, payload: Value) -> Envelope {
        let raw = Envelope::new("req-1", kind, payload).encode().unwrap();
        Envelope::decode(&shell.respond(&raw).unwrap()).unwrap()
    }

    #[test]
    fn reply_echoes_correlation_id() {
        let (_, shell) = shell();
        let reply = ask(&shell, "getSessionId", Value::Null);
        assert_eq!(reply.id, "req-1");
        assert_eq!(reply.payload, json!({"sessionId": "session-1"}));
    }

    #[test]
    fn decisions_come_from_sdk() {
        let (_, shell) = shell();
        assert_eq!(
            ask(&shell, "variation", json!({"experimentKey": 42})).payload,
            json!({"variation": "B"})
        );
        assert_eq!(
            ask(&shell, "featureFlagDetail", json!({"featureKey": 7})).payload,
            json!({"isOn": true, "reason": "DEFAULT_RULE", "parameters": {}})
        );
        assert_eq!(
            ask(
                &shell,
                "remoteConfig",
                json!({"key": "banner", "defaultValue": "", "valueType": "STRING"})
            )
            .payload,
            json!({"configValue": "Spring sale", "reason": "DEFAULT_RULE"})
        );
    }

    #[test]
    fn operations_are_applied() {
        let (sdk, shell) = shell();
        ask(
            &shell,
            "updateUserProperties",
            json!({"operations": {"$set": {"grade": "gold"}, "$increment": {"visits": 2}}}),
        );
        ask(
            &shell,
            "updateSmsSubscriptions",
            json!({"operations": {"$marketing": "UNSUBSCRIBED", "news": "SUBSCRIBED"}}),
        );

        let properties = sdk.user().properties;
        assert_eq!(properties["grade"], json!("gold"));
        assert_eq!(properties["visits"], json!(2.0));
        let sms = sdk.subscriptions("sms");
        assert_eq!(sms["$marketing"], json!("UNSUBSCRIBED"));
        assert_eq!(sms["news"], json!("SUBSCRIBED"));
    }

    #[test]
    fn unknown_command_gets_error_reply() {
        let (_, shell) = shell();
        let reply = ask(&shell, "launchRockets", Value::Null);
        assert!(reply.is_error());
    }

    #[test]
    fn foreign_traffic_is_not_answered() {
        let (_, shell) = shell();
        assert!(shell.respond(r#"{"type": "webpackOk"}"#).is_none());
    }
}
