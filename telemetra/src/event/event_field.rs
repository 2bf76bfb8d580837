use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use itertools::Itertools;
use serde_json::{Map, Value};

use crate::common::{Field, PathSegment};
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::filter::number_to_json;
use crate::spatial::GeoPoint;

use super::{Event, Producer};

/// The well-known fields of an [`Event`] a filter can address.
///
/// Two-level fields are written either as two path segments
/// (`producer->userId`) or as one dotted name (`producer.userId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventField {
    Timestamp,
    Dataset,
    MetricId,
    Producer,
    ProducerUserId,
    ProducerClientId,
    Source,
    Value,
    Tags,
    Location,
    LocationLat,
    LocationLng,
    Elevation,
    ReceivedTimestamp,
}

static FIELDS_BY_NAME: LazyLock<HashMap<&'static str, EventField>> = LazyLock::new(|| {
    EventField::ALL
        .iter()
        .map(|field| (field.name(), *field))
        .collect()
});

impl EventField {
    pub const ALL: [EventField; 14] = [
        EventField::Timestamp,
        EventField::Dataset,
        EventField::MetricId,
        EventField::Producer,
        EventField::ProducerUserId,
        EventField::ProducerClientId,
        EventField::Source,
        EventField::Value,
        EventField::Tags,
        EventField::Location,
        EventField::LocationLat,
        EventField::LocationLng,
        EventField::Elevation,
        EventField::ReceivedTimestamp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventField::Timestamp => "timestamp",
            EventField::Dataset => "dataset",
            EventField::MetricId => "metricId",
            EventField::Producer => "producer",
            EventField::ProducerUserId => "producer.userId",
            EventField::ProducerClientId => "producer.clientId",
            EventField::Source => "source",
            EventField::Value => "value",
            EventField::Tags => "tags",
            EventField::Location => "location",
            EventField::LocationLat => "location.lat",
            EventField::LocationLng => "location.lng",
            EventField::Elevation => "elevation",
            EventField::ReceivedTimestamp => "receivedTimestamp",
        }
    }

    /// Looks up the event field a path names.
    ///
    /// # Errors
    ///
    /// A [`ErrorKind::FieldPathError`] for any path that is not a known field.
    pub fn resolve(field: &Field) -> TelemetraResult<EventField> {
        let names: Option<Vec<&str>> = field.segments().iter().map(PathSegment::as_name).collect();
        let key = names.map(|names| names.iter().join("."));

        match key.as_deref().and_then(|key| FIELDS_BY_NAME.get(key)) {
            Some(event_field) => Ok(*event_field),
            None => {
                log::error!("Unknown event field {}", field);
                Err(TelemetraError::new(
                    &format!("Unknown event field '{}'", field),
                    ErrorKind::FieldPathError,
                ))
            }
        }
    }

    /// Reads this field from `event`; `None` when the event does not carry it.
    pub fn extract<'a>(&self, event: &'a Event) -> Option<Cow<'a, Value>> {
        let value = match self {
            EventField::Timestamp => Value::from(event.timestamp.timestamp_millis()),
            EventField::Dataset => Value::String(event.dataset.clone()),
            EventField::MetricId => Value::String(event.metric_id.clone()),
            EventField::Producer => producer_json(&event.producer),
            EventField::ProducerUserId => Value::String(event.producer.user_id.clone()),
            EventField::ProducerClientId => Value::String(event.producer.client_id.clone()?),
            EventField::Source => Value::String(event.source.clone()?),
            EventField::Value => match event.value.as_json() {
                Some(json) => return Some(Cow::Borrowed(json)),
                None => event.value.to_json(),
            },
            EventField::Tags => Value::Array(
                event
                    .tags
                    .as_ref()?
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
            EventField::Location => location_json(&event.location?),
            EventField::LocationLat => number_to_json(event.location?.latitude()),
            EventField::LocationLng => number_to_json(event.location?.longitude()),
            EventField::Elevation => number_to_json(event.elevation?),
            EventField::ReceivedTimestamp => {
                Value::from(event.received_timestamp?.timestamp_millis())
            }
        };
        Some(Cow::Owned(value))
    }
}

fn producer_json(producer: &Producer) -> Value {
    let mut object = Map::new();
    object.insert("userId".to_string(), Value::String(producer.user_id.clone()));
    if let Some(client_id) = &producer.client_id {
        object.insert("clientId".to_string(), Value::String(client_id.clone()));
    }
    Value::Object(object)
}

fn location_json(location: &GeoPoint) -> Value {
    let mut object = Map::new();
    object.insert("lat".to_string(), number_to_json(location.latitude()));
    object.insert("lng".to_string(), number_to_json(location.longitude()));
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &str) -> TelemetraResult<EventField> {
        EventField::resolve(&Field::parse(path).unwrap())
    }

    #[test]
    fn test_every_name_resolves_to_itself() {
        for field in EventField::ALL {
            assert_eq!(EventField::resolve(&Field::name(field.name()).unwrap()).unwrap(), field);
        }
    }

    #[test]
    fn test_two_level_paths() {
        assert_eq!(resolve("producer->userId").unwrap(), EventField::ProducerUserId);
        assert_eq!(resolve("producer->clientId").unwrap(), EventField::ProducerClientId);
        assert_eq!(resolve("location->lat").unwrap(), EventField::LocationLat);
        assert_eq!(resolve("location->lng").unwrap(), EventField::LocationLng);
    }

    #[test]
    fn test_unknown_fields() {
        for path in ["speed", "producer->name", "location->lat->x", "tags->[1]", "metricid"] {
            assert_eq!(resolve(path).unwrap_err().kind(), &ErrorKind::FieldPathError, "{}", path);
        }
    }
}
