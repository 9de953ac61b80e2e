// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Invocation Engine.
//
// Turns a command into an envelope, parks a resolver in the correlation
// registry, posts the envelope through the transport port, and waits for
// whichever comes first: the matching reply or the timeout. Everything that
// can go wrong on the channel is absorbed here; callers only ever see the
// reply payload, the command's fallback payload, or a typed `BridgeError`.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use hackle_webview_bridge::{HostContext, Transceiver};
use hackle_webview_core::config::ClientConfig;
use hackle_webview_core::error::{BridgeError, Result};
use hackle_webview_core::types::BrowserProperties;

use crate::commands::{Command, TimeoutFallback};
use crate::message::{Envelope, new_correlation_id};
use crate::registry::CorrelationRegistry;

/// Per-invocation knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOptions {
    pub timeout: Duration,
    pub on_timeout: TimeoutFallback,
    /// Replaces the engine's origin metadata for this one message.
    pub browser_properties: Option<BrowserProperties>,
}

impl InvokeOptions {
    pub fn new(timeout: Duration, on_timeout: TimeoutFallback) -> Self {
        Self {
            timeout,
            on_timeout,
            browser_properties: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, on_timeout: TimeoutFallback) -> Self {
        self.on_timeout = on_timeout;
        self
    }

    pub fn with_browser_properties(mut self, properties: BrowserProperties) -> Self {
        self.browser_properties = Some(properties);
        self
    }
}

/// Issues commands over one transceiver and correlates their replies.
pub struct Invocator {
    transceiver: Transceiver,
    registry: CorrelationRegistry,
    default_timeout: Duration,
    extra_properties: BrowserProperties,
}

impl Invocator {
    /// Take ownership of `transceiver` and install the inbound listener.
    pub fn new(transceiver: Transceiver, config: &ClientConfig) -> Self {
        let registry = CorrelationRegistry::new();
        let inbound = registry.clone();
        transceiver.add_listener(Arc::new(move |data: &str| {
            let Some(reply) = Envelope::decode(data) else {
                debug!(len = data.len(), "ignoring message not addressed to the bridge");
                return;
            };
            let id = reply.id.clone();
            inbound.resolve(&id, reply);
        }));

        Self {
            transceiver,
            registry,
            default_timeout: config.invoke_timeout(),
            extra_properties: config.browser_properties.clone(),
        }
    }

    pub fn transceiver(&self) -> &Transceiver {
        &self.transceiver
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Options for `command` taken from the policy table.
    pub fn options_for(&self, command: Command) -> InvokeOptions {
        InvokeOptions::new(self.default_timeout, command.policy().on_timeout)
    }

    /// Invoke `command` under its table policy.
    pub async fn invoke_command(&self, command: Command, payload: Value) -> Result<Value> {
        self.invoke(command.as_str(), payload, self.options_for(command))
            .await
    }

    /// Invoke `command` and decode the reply payload into `T`.
    pub async fn invoke_as<T: DeserializeOwned>(
        &self,
        command: Command,
        payload: Value,
        options: InvokeOptions,
    ) -> Result<T> {
        let reply = self.invoke(command.as_str(), payload, options).await?;
        serde_json::from_value(reply).map_err(|e| BridgeError::malformed(command.as_str(), e))
    }

    /// Send one command and wait for its reply or its timeout fallback.
    #[instrument(skip_all, fields(command = %command, timeout_ms = options.timeout.as_millis() as u64))]
    pub async fn invoke(&self, command: &str, payload: Value, options: InvokeOptions) -> Result<Value> {
        let id = new_correlation_id();
        let properties = options
            .browser_properties
            .unwrap_or_else(|| self.browser_properties());
        let serialized = Envelope::new(id.as_str(), command, payload)
            .with_browser_properties(properties)
            .encode()?;

        let (tx, rx) = oneshot::channel::<Envelope>();
        self.registry.register(
            id.as_str(),
            command,
            Box::new(move |reply: Envelope| {
                // The waiter may already be gone; nothing to do then.
                let _ = tx.send(reply);
            }),
        );
        let _pending = PendingGuard {
            registry: &self.registry,
            id: id.as_str(),
        };
        // Registered before sending: a native side may answer synchronously.
        self.transceiver.post(&serialized);
        debug!(id = %id, "bridge command sent");

        match tokio::time::timeout(options.timeout, rx).await {
            Ok(Ok(reply)) => accept(command, reply),
            Ok(Err(_)) => {
                debug!(id = %id, "client closed while waiting; using fallback");
                fallback(command, options.on_timeout, || BridgeError::Disconnected {
                    command: command.to_owned(),
                })
            }
            Err(_) => {
                warn!(id = %id, "no reply from native bridge in time; using fallback");
                let timeout_ms = options.timeout.as_millis() as u64;
                fallback(command, options.on_timeout, || BridgeError::Timeout {
                    command: command.to_owned(),
                    timeout_ms,
                })
            }
        }
    }

    /// Host origin metadata merged with the configured extras.
    pub fn browser_properties(&self) -> BrowserProperties {
        let mut properties = self.transceiver.host().browser_properties();
        properties.extend(
            self.extra_properties
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        properties
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Release the inbound listener and fail pending invocations over to
    /// their fallbacks. Idempotent.
    pub fn close(&self) {
        self.transceiver.cleanup();
        let dropped = self.registry.clear();
        debug!(dropped, "invocator closed");
    }
}

/// Evicts a registry entry when its waiter goes away, however that happens.
/// A no-op once a reply or `close()` has already taken the entry.
struct PendingGuard<'a> {
    registry: &'a CorrelationRegistry,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.registry.evict(self.id) {
            debug!(id = %self.id, "pending request evicted");
        }
    }
}

fn accept(command: &str, reply: Envelope) -> Result<Value> {
    if reply.is_error() {
        let message = match reply.payload {
            Value::String(message) => message,
            other => other.to_string(),
        };
        return Err(BridgeError::Remote {
            command: command.to_owned(),
            message,
        });
    }
    Ok(reply.payload)
}

fn fallback(
    command: &str,
    policy: TimeoutFallback,
    rejection: impl FnOnce() -> BridgeError,
) -> Result<Value> {
    match policy {
        TimeoutFallback::Resolve(value) => Ok(value),
        TimeoutFallback::Reject => {
            debug!(command, "fallback policy rejects");
            Err(rejection())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hackle_webview_bridge::MemoryHost;
    use serde_json::json;

    fn invocator(host: &MemoryHost) -> Invocator {
        let port = host.bridge_port().unwrap();
        Invocator::new(
            Transceiver::new(Arc::new(host.clone()), port),
            &ClientConfig::default(),
        )
    }

    /// Native side answering every request with `payload`.
    fn answering(payload: Value) -> MemoryHost {
        MemoryHost::injected(move |raw| {
            let request = Envelope::decode(raw)?;
            Envelope::new(request.id, request.kind, payload.clone())
                .encode()
                .ok()
        })
    }

    fn silent() -> MemoryHost {
        MemoryHost::injected(|_| None)
    }

    fn sent(host: &MemoryHost) -> Vec<Envelope> {
        host.sent_messages()
            .iter()
            .filter_map(|raw| Envelope::decode(raw))
            .collect()
    }

    #[tokio::test]
    async fn reply_resolves_invocation() {
        let host = answering(json!({"variation": "B"}));
        let engine = invocator(&host);
        let reply = engine
            .invoke_command(Command::Variation, json!({"experimentKey": 42}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"variation": "B"}));
        assert_eq!(engine.pending_count(), 0);

        let request = &sent(&host)[0];
        assert_eq!(request.kind, "variation");
        assert_eq!(request.payload, json!({"experimentKey": 42}));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_resolves_to_policy_default() {
        let host = silent();
        let engine = invocator(&host);
        let reply = engine
            .invoke_command(Command::Variation, json!({"experimentKey": 1}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"variation": "A"}));
        assert_eq!(engine.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_rejects_detail_commands() {
        let host = silent();
        let engine = invocator(&host);
        let err = engine
            .invoke_command(Command::VariationDetail, json!({"experimentKey": 1}))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_after_timeout_is_ignored() {
        let host = silent();
        let engine = invocator(&host);
        let reply = engine
            .invoke_command(Command::IsFeatureOn, json!({"featureKey": 3}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"isOn": false}));

        let request = sent(&host).remove(0);
        let late = Envelope::new(request.id, "isFeatureOn", json!({"isOn": true}));
        host.dispatch(&late.encode().unwrap());
        assert_eq!(engine.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_timeout_is_honoured() {
        let host = silent();
        let engine = invocator(&host);
        let started = tokio::time::Instant::now();
        let options = engine
            .options_for(Command::GetSessionId)
            .with_timeout(Duration::from_millis(250));
        engine
            .invoke("getSessionId", Value::Null, options)
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_messages_do_not_disturb_pending() {
        let host = silent();
        let engine = Arc::new(invocator(&host));

        let waiter = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .invoke_command(Command::GetSessionId, Value::Null)
                    .await
            })
        };
        while sent(&host).is_empty() {
            tokio::task::yield_now().await;
        }

        host.dispatch(r#"{"type": "webpackOk", "data": 1}"#);
        host.dispatch("not even json");
        host.dispatch(r#"{"_hackle_message": {"type": "getSessionId"}}"#);
        assert_eq!(engine.pending_count(), 1);

        let request = sent(&host).remove(0);
        let reply = Envelope::new(request.id, "getSessionId", json!({"sessionId": "s-1"}));
        host.dispatch(&reply.encode().unwrap());

        let payload = waiter.await.unwrap().unwrap();
        assert_eq!(payload, json!({"sessionId": "s-1"}));
    }

    #[tokio::test]
    async fn out_of_order_replies_match_by_id() {
        let host = silent();
        let engine = Arc::new(invocator(&host));

        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .invoke_command(Command::Variation, json!({"experimentKey": 1}))
                    .await
            })
        };
        let second = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .invoke_command(Command::Variation, json!({"experimentKey": 2}))
                    .await
            })
        };
        while sent(&host).len() < 2 {
            tokio::task::yield_now().await;
        }

        // Answer in reverse order; each reply names its experiment.
        for request in sent(&host).into_iter().rev() {
            let key = request.payload["experimentKey"].clone();
            let reply = Envelope::new(request.id, "variation", json!({"variation": key.to_string()}));
            host.dispatch(&reply.encode().unwrap());
        }

        assert_eq!(first.await.unwrap().unwrap(), json!({"variation": "1"}));
        assert_eq!(second.await.unwrap().unwrap(), json!({"variation": "2"}));
    }

    #[tokio::test]
    async fn error_reply_surfaces_as_remote_failure() {
        let host = MemoryHost::injected(|raw| {
            let request = Envelope::decode(raw)?;
            Envelope::new(request.id, "error", json!("sdk not initialized"))
                .encode()
                .ok()
        });
        let engine = invocator(&host);
        let err = engine
            .invoke_command(Command::GetUser, Value::Null)
            .await
            .unwrap_err();
        match err {
            BridgeError::Remote { command, message } => {
                assert_eq!(command, "getUser");
                assert_eq!(message, "sdk not initialized");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_reply_fails_typed_decode() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct IsOn {
            #[serde(rename = "isOn")]
            is_on: bool,
        }

        let host = answering(json!("definitely not an object"));
        let engine = invocator(&host);
        let options = engine.options_for(Command::IsFeatureOn);
        let err = engine
            .invoke_as::<IsOn>(Command::IsFeatureOn, json!({"featureKey": 1}), options)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedReply { .. }));
    }

    #[tokio::test]
    async fn envelopes_carry_browser_properties() {
        let host = answering(Value::Null);
        host.set_browser_property("browserName", "Chrome");
        host.set_browser_property("platform", "web");

        let mut config = ClientConfig::default();
        config.browser_properties.insert("platform".into(), "android-webview".into());
        let port = host.bridge_port().unwrap();
        let engine = Invocator::new(Transceiver::new(Arc::new(host.clone()), port), &config);

        engine.invoke_command(Command::Fetch, Value::Null).await.unwrap();

        let properties = sent(&host)[0].browser_properties.clone().unwrap();
        assert_eq!(properties["browserName"], "Chrome");
        assert_eq!(properties["platform"], "android-webview");
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_invocations_leave_no_pending_entries() {
        let host = silent();
        let engine = invocator(&host);

        for _ in 0..100 {
            let abandoned = tokio::time::timeout(
                Duration::from_millis(10),
                engine.invoke_command(Command::Variation, json!({"experimentKey": 42})),
            )
            .await;
            assert!(abandoned.is_err());
        }

        assert_eq!(engine.pending_count(), 0);
        assert_eq!(sent(&host).len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_task_releases_its_entry() {
        let host = silent();
        let engine = Arc::new(invocator(&host));

        let waiter = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .invoke_command(Command::IsFeatureOn, json!({"featureKey": 3}))
                    .await
            })
        };
        while engine.pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(engine.pending_count(), 0);
    }

    #[tokio::test]
    async fn close_fails_pending_over_to_fallback() {
        let host = silent();
        let engine = Arc::new(invocator(&host));

        let waiter = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .invoke_command(Command::FeatureFlagDetail, json!({"featureKey": 9}))
                    .await
            })
        };
        while engine.pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        engine.close();
        assert_eq!(host.listener_count(), 0);
        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::Disconnected { .. }));
    }
}
