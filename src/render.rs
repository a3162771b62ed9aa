//! Value rendering: raw decoded primitives to semantic values.
//!
//! Rendering runs, in order: invalid-sentinel suppression (absence stays
//! absent), enum label lookup, custom per-type converters, then scale and
//! offset. The converter set is a closed match on the type name, so an
//! unregistered name simply falls through to the enum-resolved or raw value.
//!
//! Scale and offset apply as `(raw / scale) - offset`, divide first, and
//! only when the value is still numeric after the converter step. A field
//! declaring neither passes its value through unchanged.

use chrono::{DateTime, Utc};

use crate::profile::FieldDescriptor;
use crate::types::Value;

/// The FIT epoch (1989-12-31T00:00:00 UTC) as a Unix timestamp.
pub const FIT_EPOCH_UNIX: i64 = 631_065_600;

/// `date_time` values below this threshold are relative/system counts, left
/// untouched. A format heuristic, preserved exactly.
const DATE_TIME_ABSOLUTE_THRESHOLD: u64 = 0x1000_0000;

/// Render a raw value through a field or subfield descriptor.
///
/// Absence propagates; arrays render element-wise through the same scalar
/// path.
pub fn render(descriptor: &dyn FieldDescriptor, raw: Option<&Value>) -> Option<Value> {
    match raw? {
        Value::Array(elements) => {
            let rendered = elements
                .iter()
                .map(|element| render_scalar(descriptor, element.as_ref()?))
                .collect();
            Some(Value::Array(rendered))
        }
        scalar => render_scalar(descriptor, scalar),
    }
}

fn render_scalar(descriptor: &dyn FieldDescriptor, raw: &Value) -> Option<Value> {
    if let Some(label) = descriptor.type_ref().label_for(raw) {
        return Some(Value::String(label.to_owned()));
    }

    let converted = match descriptor.type_ref().name() {
        "date_time" => convert_date_time(raw),
        "local_date_time" => convert_local_date_time(raw),
        "bool" => convert_bool(raw),
        _ => None,
    };

    let value = converted.unwrap_or_else(|| raw.clone());
    Some(apply_scale_offset(descriptor, value))
}

/// Absolute timestamps count seconds from the FIT epoch; values below the
/// threshold are small relative counts and pass through as-is.
fn convert_date_time(raw: &Value) -> Option<Value> {
    let seconds = raw.as_u64()?;
    if seconds < DATE_TIME_ABSOLUTE_THRESHOLD {
        return None;
    }
    DateTime::from_timestamp(FIT_EPOCH_UNIX + seconds as i64, 0).map(Value::Timestamp)
}

/// Local timestamps always count from the FIT epoch, rendered naive (no UTC
/// qualification).
fn convert_local_date_time(raw: &Value) -> Option<Value> {
    let seconds = raw.as_u64()?;
    DateTime::from_timestamp(FIT_EPOCH_UNIX + seconds as i64, 0)
        .map(|timestamp| Value::LocalTimestamp(timestamp.naive_utc()))
}

fn convert_bool(raw: &Value) -> Option<Value> {
    raw.as_u64().map(|v| Value::Bool(v != 0))
}

fn apply_scale_offset(descriptor: &dyn FieldDescriptor, value: Value) -> Value {
    if descriptor.scale().is_none() && descriptor.offset().is_none() {
        return value;
    }
    let Some(numeric) = value.as_f64() else {
        return value;
    };
    Value::Float64(numeric / descriptor.scale().unwrap_or(1.0) - descriptor.offset().unwrap_or(0.0))
}
