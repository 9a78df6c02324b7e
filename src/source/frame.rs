//! Device frame decoding.
//!
//! The sensor rig sends JSON text frames of two shapes:
//!
//! ```json
//! {"type": "live_measurement", "data": {"1": 120.2, "2": 141.0}}
//! {"type": "done", "data": {"1": 120.5, "4": 90.0}}
//! ```
//!
//! Keys in `data` are channel ids; they are remapped to named fields here.
//! Anything else on the wire (non-JSON, unknown `type`) decodes to `None`.

use std::collections::BTreeMap;

use bodywatch_types::{MeasurementFields, Scalar};
use serde::Deserialize;
use serde_json::Value;

/// A decoded device frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    /// In-progress readings; replaces the previous live readings entirely.
    Live(MeasurementFields),
    /// The complete measurement.
    Done(MeasurementFields),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decode one text frame.
///
/// Returns `None` for frames that should be dropped: invalid JSON, a
/// missing or unknown `type`, or a live frame without data.
pub fn parse_frame(text: &str) -> Option<DeviceMessage> {
    let frame: RawFrame = serde_json::from_str(text.trim()).ok()?;
    match frame.kind.as_str() {
        "live_measurement" if frame.data.is_null() => None,
        "live_measurement" => Some(DeviceMessage::Live(fields_from_value(frame.data))),
        "done" => Some(DeviceMessage::Done(fields_from_value(frame.data))),
        _ => None,
    }
}

/// Remap a JSON object into a field set. Non-objects yield an empty set.
pub fn fields_from_value(value: Value) -> MeasurementFields {
    MeasurementFields::from_raw(scalars_from_value(value))
}

/// Scalar entries of a JSON object, keyed exactly as sent.
pub fn scalars_from_value(value: Value) -> BTreeMap<String, Scalar> {
    let Value::Object(map) = value else {
        return BTreeMap::new();
    };
    map.into_iter().filter_map(|(k, v)| scalar(v).map(|v| (k, v))).collect()
}

fn scalar(value: Value) -> Option<Scalar> {
    match value {
        Value::Number(n) => n.as_f64().map(Scalar::Number),
        Value::String(s) => Some(Scalar::Text(s)),
        Value::Bool(b) => Some(Scalar::Bool(b)),
        // Nested values carry nothing the dashboard can show.
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
