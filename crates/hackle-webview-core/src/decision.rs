// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decision results returned to callers: experiment variations, feature flag
// states, remote config values, and the parameter bag attached to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Variation handed out when no real decision could be made.
pub const DEFAULT_VARIATION: &str = "A";

/// How a decision was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    SdkNotReady,
    Exception,
    InvalidInput,
    ExperimentNotFound,
    ExperimentDraft,
    ExperimentPaused,
    ExperimentCompleted,
    Overridden,
    TrafficNotAllocated,
    TrafficAllocated,
    TrafficAllocatedByTargeting,
    NotInMutualExclusionExperiment,
    IdentifierNotFound,
    VariationDropped,
    NotInExperimentTarget,
    FeatureFlagNotFound,
    FeatureFlagInactive,
    IndividualTargetMatch,
    TargetRuleMatch,
    DefaultRule,
    RemoteConfigParameterNotFound,
    TypeMismatch,
    UnsupportedPlatform,
    /// A reason this version of the bridge does not know about.
    #[serde(other)]
    Unknown,
}

/// A scalar parameter value: string, number, or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

/// Wire name of a parameter value's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    String,
    Number,
    Boolean,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "STRING",
            ValueType::Number => "NUMBER",
            ValueType::Boolean => "BOOLEAN",
        }
    }
}

impl ParameterValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ParameterValue::Boolean(_) => ValueType::Boolean,
            ParameterValue::Number(_) => ValueType::Number,
            ParameterValue::String(_) => ValueType::String,
        }
    }

    /// Accept only JSON scalars; `null`, arrays, and objects are rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ParameterValue::Boolean(*b)),
            Value::Number(n) => n.as_f64().map(ParameterValue::Number),
            Value::String(s) => Some(ParameterValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParameterValue::Boolean(b) => Value::Bool(*b),
            ParameterValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ParameterValue::String(s) => Value::String(s.clone()),
        }
    }

    /// Convert `raw` into a value of `target`'s type.
    ///
    /// Numbers come from numbers, numeric strings, and booleans (1/0);
    /// booleans from booleans, `"true"`/`"false"`, and numbers (non-zero is
    /// true); strings from any scalar. Returns `None` when no sensible
    /// conversion exists.
    pub fn coerce(raw: &Value, target: ValueType) -> Option<Self> {
        match (target, raw) {
            (ValueType::Number, Value::Number(n)) => n.as_f64().map(ParameterValue::Number),
            (ValueType::Number, Value::String(s)) => {
                s.trim().parse::<f64>().ok().map(ParameterValue::Number)
            }
            (ValueType::Number, Value::Bool(b)) => {
                Some(ParameterValue::Number(if *b { 1.0 } else { 0.0 }))
            }
            (ValueType::Boolean, Value::Bool(b)) => Some(ParameterValue::Boolean(*b)),
            (ValueType::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Some(ParameterValue::Boolean(true)),
                "false" => Some(ParameterValue::Boolean(false)),
                _ => None,
            },
            (ValueType::Boolean, Value::Number(n)) => {
                n.as_f64().map(|n| ParameterValue::Boolean(n != 0.0))
            }
            (ValueType::String, Value::String(s)) => Some(ParameterValue::String(s.clone())),
            (ValueType::String, Value::Number(n)) => Some(ParameterValue::String(n.to_string())),
            (ValueType::String, Value::Bool(b)) => Some(ParameterValue::String(b.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_owned())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Number(value as f64)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Boolean(value)
    }
}

/// Typed key-value parameters attached to a decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterConfig {
    parameters: BTreeMap<String, ParameterValue>,
}

impl ParameterConfig {
    pub fn new(parameters: BTreeMap<String, ParameterValue>) -> Self {
        Self { parameters }
    }

    /// Build from an untyped JSON object, silently dropping entries that are
    /// not string, number, or boolean. Anything other than an object yields
    /// an empty bag.
    pub fn from_json(value: &Value) -> Self {
        let parameters = match value {
            Value::Object(map) => map
                .iter()
                .filter_map(|(key, raw)| ParameterValue::from_json(raw).map(|v| (key.clone(), v)))
                .collect(),
            _ => BTreeMap::new(),
        };
        Self { parameters }
    }

    /// Look up `key`, guarded by the type of `default`.
    ///
    /// Missing key: `default`. No default: the stored value as-is. Otherwise
    /// the stored value only when its type matches the default's.
    pub fn get(&self, key: &str, default: Option<ParameterValue>) -> Option<ParameterValue> {
        let Some(stored) = self.parameters.get(key) else {
            return default;
        };
        match default {
            None => Some(stored.clone()),
            Some(default) if default.value_type() == stored.value_type() => Some(stored.clone()),
            Some(default) => Some(default),
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key, Some(default.into()))
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| default.to_owned())
    }

    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        self.get(key, Some(default.into()))
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key, Some(default.into()))
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Outcome of an experiment variation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub variation: String,
    pub reason: DecisionReason,
    pub parameters: ParameterConfig,
}

impl Decision {
    pub fn of(variation: impl Into<String>, reason: DecisionReason) -> Self {
        Self {
            variation: variation.into(),
            reason,
            parameters: ParameterConfig::default(),
        }
    }

    /// The default variation, tagged as an exception.
    pub fn exception() -> Self {
        Self::of(DEFAULT_VARIATION, DecisionReason::Exception)
    }
}

/// Outcome of a feature flag lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFlagDecision {
    pub is_on: bool,
    pub reason: DecisionReason,
    pub parameters: ParameterConfig,
}

impl FeatureFlagDecision {
    pub fn on(reason: DecisionReason) -> Self {
        Self {
            is_on: true,
            reason,
            parameters: ParameterConfig::default(),
        }
    }

    pub fn off(reason: DecisionReason) -> Self {
        Self {
            is_on: false,
            reason,
            parameters: ParameterConfig::default(),
        }
    }
}

/// Outcome of a remote config lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfigValue {
    pub value: ParameterValue,
    pub reason: DecisionReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag() -> ParameterConfig {
        ParameterConfig::from_json(&json!({
            "flag": "text",
            "limit": 10,
            "enabled": true,
            "nested": {"a": 1},
            "missing": null,
        }))
    }

    #[test]
    fn type_mismatch_returns_default() {
        let params = bag();
        assert_eq!(params.get("flag", Some(true.into())), Some(ParameterValue::Boolean(true)));
        assert_eq!(params.get("flag", Some("x".into())), Some("text".into()));
    }

    #[test]
    fn absent_default_returns_stored_value() {
        let params = bag();
        assert_eq!(params.get("limit", None), Some(ParameterValue::Number(10.0)));
        assert_eq!(params.get("nope", None), None);
    }

    #[test]
    fn missing_key_returns_default() {
        let params = bag();
        assert_eq!(params.get("nope", Some(3.0.into())), Some(ParameterValue::Number(3.0)));
    }

    #[test]
    fn non_scalars_are_dropped_at_decode() {
        let params = bag();
        assert_eq!(params.len(), 3);
        assert_eq!(params.get_number("nested", 7.0), 7.0);
        assert!(params.get_bool("missing", true));
    }

    #[test]
    fn typed_helpers() {
        let params = bag();
        assert_eq!(params.get_string("flag", "x"), "text");
        assert_eq!(params.get_number("limit", 0.0), 10.0);
        assert!(params.get_bool("enabled", false));
        assert_eq!(params.get_string("limit", "fallback"), "fallback");
    }

    #[test]
    fn unknown_reason_decodes() {
        let reason: DecisionReason = serde_json::from_value(json!("SOMETHING_NEW")).unwrap();
        assert_eq!(reason, DecisionReason::Unknown);
        let reason: DecisionReason = serde_json::from_value(json!("TRAFFIC_ALLOCATED")).unwrap();
        assert_eq!(reason, DecisionReason::TrafficAllocated);
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(
            ParameterValue::coerce(&json!("12.5"), ValueType::Number),
            Some(ParameterValue::Number(12.5))
        );
        assert_eq!(
            ParameterValue::coerce(&json!("false"), ValueType::Boolean),
            Some(ParameterValue::Boolean(false))
        );
        assert_eq!(
            ParameterValue::coerce(&json!(0), ValueType::Boolean),
            Some(ParameterValue::Boolean(false))
        );
        assert_eq!(
            ParameterValue::coerce(&json!(true), ValueType::String),
            Some("true".into())
        );
        assert_eq!(ParameterValue::coerce(&json!("abc"), ValueType::Number), None);
        assert_eq!(ParameterValue::coerce(&Value::Null, ValueType::String), None);
    }

    #[test]
    fn exception_decision_uses_default_variation() {
        let decision = Decision::exception();
        assert_eq!(decision.variation, "A");
        assert_eq!(decision.reason, DecisionReason::Exception);
        assert!(decision.parameters.is_empty());
    }
}
