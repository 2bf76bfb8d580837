//! The typed event record adapter.
//!
//! Filters over events address a fixed set of well-known fields (see
//! [`EventField`]). For a derived metric whose value is a JSON document, a
//! path starting with `value` and longer than one segment is resolved inside
//! that document, so `value->readings->[2]` reaches into the payload.

mod event_field;
mod model;

pub use event_field::EventField;
pub use model::*;

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::common::Field;
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::evaluator::{resolve_path, Record};
use crate::spatial::GeoPoint;

impl Record for Event {
    fn field_value(&self, field: &Field) -> TelemetraResult<Option<Cow<'_, Value>>> {
        if field.len() > 1 && field.head().as_name() == Some(EventField::Value.name()) {
            return self.payload_value(field);
        }
        Ok(EventField::resolve(field)?.extract(self))
    }

    fn tags(&self) -> TelemetraResult<Option<&BTreeSet<String>>> {
        Ok(self.tags.as_ref())
    }

    fn location(&self) -> TelemetraResult<Option<GeoPoint>> {
        Ok(self.location)
    }

    fn record_kind(&self) -> &'static str {
        "event"
    }
}

impl Event {
    fn payload_value(&self, field: &Field) -> TelemetraResult<Option<Cow<'_, Value>>> {
        let payload = match self.value.as_json() {
            Some(payload) => payload,
            None => {
                log::error!("Path {} reaches into a scalar metric value", field);
                return Err(TelemetraError::new(
                    &format!("Path '{}' reaches into a metric value that is not JSON", field),
                    ErrorKind::FieldPathError,
                ));
            }
        };

        match field.suffix(1) {
            Some(suffix) => Ok(resolve_path(payload, &suffix)?.map(Cow::Borrowed)),
            None => Ok(Some(Cow::Borrowed(payload))),
        }
    }
}
