use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::number_to_json;
use crate::spatial::GeoPoint;

/// A single measurement reported by a producer.
///
/// Timestamps travel as epoch milliseconds, the same unit filters use when
/// they compare `timestamp` or `receivedTimestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub dataset: String,
    pub metric_id: String,
    pub producer: Producer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub value: MetricValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub received_timestamp: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(
        timestamp: DateTime<Utc>,
        dataset: &str,
        metric_id: &str,
        producer: Producer,
        value: MetricValue,
    ) -> Self {
        Event {
            timestamp,
            dataset: dataset.to_string(),
            metric_id: metric_id.to_string(),
            producer,
            source: None,
            value,
            tags: None,
            location: None,
            elevation: None,
            received_timestamp: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_received_timestamp(mut self, received: DateTime<Utc>) -> Self {
        self.received_timestamp = Some(received);
        self
    }
}

/// Who reported an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl Producer {
    pub fn new(user_id: &str) -> Self {
        Producer {
            user_id: user_id.to_string(),
            client_id: None,
        }
    }

    pub fn with_client(user_id: &str, client_id: &str) -> Self {
        Producer {
            user_id: user_id.to_string(),
            client_id: Some(client_id.to_string()),
        }
    }
}

/// The payload of an event.
///
/// Derived metrics carry a JSON document whose sub-paths can be filtered on
/// with `value->...` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Json(Value),
}

impl MetricValue {
    /// The payload as a JSON value, as filters see it.
    pub fn to_json(&self) -> Value {
        match self {
            MetricValue::Number(n) => number_to_json(*n),
            MetricValue::Bool(b) => Value::Bool(*b),
            MetricValue::Text(s) => Value::String(s.clone()),
            MetricValue::Json(value) => value.clone(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            MetricValue::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Bool(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<Value> for MetricValue {
    fn from(value: Value) -> Self {
        MetricValue::Json(value)
    }
}
