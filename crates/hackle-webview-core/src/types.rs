// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: users, events, and the operation sets that mutate them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Origin metadata describing the calling browser/client context.
pub type BrowserProperties = BTreeMap<String, String>;

/// The identity the SDK evaluates flags and experiments against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub identifiers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl User {
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// True when no identifier of any kind is set.
    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
            && self.user_id.is_none()
            && self.device_id.is_none()
            && self.identifiers.is_empty()
    }
}

/// A custom analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackleEvent {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl HackleEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A set of user property mutations, applied atomically by the SDK.
///
/// Each field maps property keys to the operand for that operation. Build it
/// directly from named fields; `to_record` yields the `$`-prefixed wire form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyOperations {
    pub set: BTreeMap<String, Value>,
    pub set_once: BTreeMap<String, Value>,
    pub unset: Vec<String>,
    pub increment: BTreeMap<String, f64>,
    pub append: BTreeMap<String, Value>,
    pub append_once: BTreeMap<String, Value>,
    pub prepend: BTreeMap<String, Value>,
    pub prepend_once: BTreeMap<String, Value>,
    pub remove: BTreeMap<String, Value>,
    pub clear_all: bool,
}

impl PropertyOperations {
    pub fn is_empty(&self) -> bool {
        self.to_record().is_empty()
    }

    /// Wire representation: `{"$set": {...}, "$unset": {"k": "-"}, ...}`.
    ///
    /// `$clearAll` supersedes every other operation.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();

        if self.clear_all {
            record.insert("$clearAll".into(), single("clearAll", Value::from("-")));
            return record;
        }

        insert_group(&mut record, "$set", &self.set);
        insert_group(&mut record, "$setOnce", &self.set_once);
        if !self.unset.is_empty() {
            let group = self
                .unset
                .iter()
                .map(|key| (key.clone(), Value::from("-")))
                .collect();
            record.insert("$unset".into(), Value::Object(group));
        }
        if !self.increment.is_empty() {
            let group = self
                .increment
                .iter()
                .map(|(key, by)| (key.clone(), Value::from(*by)))
                .collect();
            record.insert("$increment".into(), Value::Object(group));
        }
        insert_group(&mut record, "$append", &self.append);
        insert_group(&mut record, "$appendOnce", &self.append_once);
        insert_group(&mut record, "$prepend", &self.prepend);
        insert_group(&mut record, "$prependOnce", &self.prepend_once);
        insert_group(&mut record, "$remove", &self.remove);
        record
    }
}

fn insert_group(record: &mut Map<String, Value>, name: &str, group: &BTreeMap<String, Value>) {
    if group.is_empty() {
        return;
    }
    let object = group
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    record.insert(name.into(), Value::Object(object));
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.into(), value);
    Value::Object(map)
}

/// Consent state for one subscription topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Subscribed => "SUBSCRIBED",
            SubscriptionStatus::Unsubscribed => "UNSUBSCRIBED",
            SubscriptionStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Subscription changes for one channel (push, SMS, Kakao).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionOperations {
    pub marketing: Option<SubscriptionStatus>,
    pub information: Option<SubscriptionStatus>,
    pub custom: BTreeMap<String, SubscriptionStatus>,
}

impl SubscriptionOperations {
    /// Wire representation: `{"$marketing": "SUBSCRIBED", "<topic>": ...}`.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        if let Some(status) = self.marketing {
            record.insert("$marketing".into(), Value::from(status.as_str()));
        }
        if let Some(status) = self.information {
            record.insert("$information".into(), Value::from(status.as_str()));
        }
        for (topic, status) in &self.custom {
            record.insert(topic.clone(), Value::from(status.as_str()));
        }
        record
    }
}

/// Optional overrides for a manual page view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
}

/// A page as seen by the lifecycle tracker of the embedded SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub url: String,
    pub entered_at: DateTime<Utc>,
}

/// Time spent on a page, reported when the page loses focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    pub page: Page,
    pub duration_millis: u64,
}

/// An in-app message currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppMessageView {
    pub in_app_message_key: i64,
    #[serde(default)]
    pub properties: Map<String, Value>,
}
