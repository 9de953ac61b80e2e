// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote config lookups.
//
// Both client variants hand out the same handle. Every lookup settles to a
// value of the default's type; failures of any kind yield the default.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use hackle_webview_core::decision::{DecisionReason, ParameterValue, RemoteConfigValue};
use hackle_webview_protocol::{Command, Invocator};

use crate::sdk::EmbeddedSdk;

#[derive(Clone)]
enum ConfigSource {
    Bridged(Arc<Invocator>),
    Direct(Arc<dyn EmbeddedSdk>),
}

/// Handle for typed remote config lookups.
#[derive(Clone)]
pub struct WebViewRemoteConfig {
    source: ConfigSource,
}

impl WebViewRemoteConfig {
    pub(crate) fn bridged(invocator: Arc<Invocator>) -> Self {
        Self {
            source: ConfigSource::Bridged(invocator),
        }
    }

    pub(crate) fn direct(sdk: Arc<dyn EmbeddedSdk>) -> Self {
        Self {
            source: ConfigSource::Direct(sdk),
        }
    }

    /// Value for `key`, or `default` when absent, mistyped, or unreachable.
    pub async fn get(&self, key: &str, default: impl Into<ParameterValue>) -> ParameterValue {
        self.get_detail(key, default).await.value
    }

    pub async fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key, default)
            .await
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| default.to_owned())
    }

    pub async fn get_number(&self, key: &str, default: f64) -> f64 {
        self.get(key, default).await.as_f64().unwrap_or(default)
    }

    pub async fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key, default).await.as_bool().unwrap_or(default)
    }

    /// Value for `key` together with the reason it was chosen.
    pub async fn get_detail(
        &self,
        key: &str,
        default: impl Into<ParameterValue>,
    ) -> RemoteConfigValue {
        let default = default.into();
        match &self.source {
            ConfigSource::Direct(sdk) => {
                let detail = sdk.remote_config(key, &default);
                if detail.value.value_type() == default.value_type() {
                    detail
                } else {
                    type_mismatch(default)
                }
            }
            ConfigSource::Bridged(invocator) => {
                let payload = json!({
                    "key": key,
                    "defaultValue": default.to_json(),
                    "valueType": default.value_type().as_str(),
                });
                match invocator.invoke_command(Command::RemoteConfig, payload).await {
                    Ok(reply) => from_reply(key, &reply, default),
                    Err(e) => {
                        warn!(key, error = %e, "remote config lookup failed; returning default");
                        RemoteConfigValue {
                            value: default,
                            reason: DecisionReason::Exception,
                        }
                    }
                }
            }
        }
    }
}

fn from_reply(key: &str, reply: &Value, default: ParameterValue) -> RemoteConfigValue {
    let raw = reply.get("configValue").unwrap_or(&Value::Null);
    let Some(value) = ParameterValue::coerce(raw, default.value_type()) else {
        debug!(key, %raw, "remote config value does not match default type");
        return type_mismatch(default);
    };
    let reason = reply
        .get("reason")
        .and_then(|reason| serde_json::from_value(reason.clone()).ok())
        .unwrap_or(DecisionReason::DefaultRule);
    RemoteConfigValue { value, reason }
}

fn type_mismatch(default: ParameterValue) -> RemoteConfigValue {
    RemoteConfigValue {
        value: default,
        reason: DecisionReason::TypeMismatch,
    }
}
