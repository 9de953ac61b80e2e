// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command catalog and per-command timeout policy.
//
// The policy table is the single place that decides what a command resolves
// to when the native side stays silent: read-like commands resolve to a safe
// default, detail commands (and remote config, whose default is the caller's)
// reject so the facade can tag the result with the exception reason, and
// fire-and-forget commands resolve to nothing.

use serde_json::{Value, json};

use hackle_webview_core::decision::{DEFAULT_VARIATION, DecisionReason};

/// Every command the bridge can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GetSessionId,
    GetUser,
    SetUser,
    SetUserId,
    SetDeviceId,
    SetUserProperty,
    SetUserProperties,
    UpdateUserProperties,
    UpdatePushSubscriptions,
    UpdateSmsSubscriptions,
    UpdateKakaoSubscriptions,
    SetPhoneNumber,
    UnsetPhoneNumber,
    ResetUser,
    Variation,
    VariationDetail,
    IsFeatureOn,
    FeatureFlagDetail,
    Track,
    RemoteConfig,
    ShowUserExplorer,
    HideUserExplorer,
    Fetch,
}

/// What an invocation resolves to when its timeout fires first.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeoutFallback {
    /// Resolve with this payload as if the native side had sent it.
    Resolve(Value),
    /// Fail with `BridgeError::Timeout`.
    Reject,
}

/// Timeout behaviour of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPolicy {
    pub on_timeout: TimeoutFallback,
    /// Reason the facade attaches to a result synthesized after a timeout.
    pub fallback_reason: Option<DecisionReason>,
    /// Whether completing the command fires `user-updated`.
    pub mutates_user: bool,
}

impl Command {
    pub const ALL: [Command; 23] = [
        Command::GetSessionId,
        Command::GetUser,
        Command::SetUser,
        Command::SetUserId,
        Command::SetDeviceId,
        Command::SetUserProperty,
        Command::SetUserProperties,
        Command::UpdateUserProperties,
        Command::UpdatePushSubscriptions,
        Command::UpdateSmsSubscriptions,
        Command::UpdateKakaoSubscriptions,
        Command::SetPhoneNumber,
        Command::UnsetPhoneNumber,
        Command::ResetUser,
        Command::Variation,
        Command::VariationDetail,
        Command::IsFeatureOn,
        Command::FeatureFlagDetail,
        Command::Track,
        Command::RemoteConfig,
        Command::ShowUserExplorer,
        Command::HideUserExplorer,
        Command::Fetch,
    ];

    /// Wire name carried in the envelope's `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::GetSessionId => "getSessionId",
            Command::GetUser => "getUser",
            Command::SetUser => "setUser",
            Command::SetUserId => "setUserId",
            Command::SetDeviceId => "setDeviceId",
            Command::SetUserProperty => "setUserProperty",
            Command::SetUserProperties => "setUserProperties",
            Command::UpdateUserProperties => "updateUserProperties",
            Command::UpdatePushSubscriptions => "updatePushSubscriptions",
            Command::UpdateSmsSubscriptions => "updateSmsSubscriptions",
            Command::UpdateKakaoSubscriptions => "updateKakaoSubscriptions",
            Command::SetPhoneNumber => "setPhoneNumber",
            Command::UnsetPhoneNumber => "unsetPhoneNumber",
            Command::ResetUser => "resetUser",
            Command::Variation => "variation",
            Command::VariationDetail => "variationDetail",
            Command::IsFeatureOn => "isFeatureOn",
            Command::FeatureFlagDetail => "featureFlagDetail",
            Command::Track => "track",
            Command::RemoteConfig => "remoteConfig",
            Command::ShowUserExplorer => "showUserExplorer",
            Command::HideUserExplorer => "hideUserExplorer",
            Command::Fetch => "fetch",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Command::ALL.into_iter().find(|command| command.as_str() == name)
    }

    /// The policy table.
    pub fn policy(self) -> CommandPolicy {
        use Command::*;

        let (on_timeout, fallback_reason) = match self {
            GetSessionId => (resolve(json!({"sessionId": ""})), None),
            GetUser => (resolve(json!({"user": {}})), None),
            Variation => (resolve(json!({"variation": DEFAULT_VARIATION})), None),
            IsFeatureOn => (resolve(json!({"isOn": false})), None),
            // The facade substitutes an exception-tagged result.
            VariationDetail | FeatureFlagDetail | RemoteConfig => {
                (TimeoutFallback::Reject, Some(DecisionReason::Exception))
            }
            SetUser | SetUserId | SetDeviceId | SetUserProperty | SetUserProperties
            | UpdateUserProperties | UpdatePushSubscriptions | UpdateSmsSubscriptions
            | UpdateKakaoSubscriptions | SetPhoneNumber | UnsetPhoneNumber | ResetUser | Track
            | ShowUserExplorer | HideUserExplorer | Fetch => (resolve(Value::Null), None),
        };

        let mutates_user = matches!(
            self,
            SetUser
                | SetUserId
                | SetDeviceId
                | SetUserProperty
                | SetUserProperties
                | UpdateUserProperties
                | UpdatePushSubscriptions
                | UpdateSmsSubscriptions
                | UpdateKakaoSubscriptions
                | ResetUser
        );

        CommandPolicy {
            on_timeout,
            fallback_reason,
            mutates_user,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn resolve(value: Value) -> TimeoutFallback {
    TimeoutFallback::Resolve(value)
}
