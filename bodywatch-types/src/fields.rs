//! Measurement field sets.

use std::collections::BTreeMap;
use std::fmt;

use crate::Channel;

/// A loosely typed payload value.
///
/// Device payloads are mostly numeric, but keys that are not channels
/// (`name`, `age`, `weight`) may carry anything the firmware sends.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Scalar {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    /// Numeric view of the value. Numeric strings count as numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Channel readings plus any pass-through keys.
///
/// Any subset of channels may be present; the device reports them
/// incrementally. Serialized as a flat camelCase object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementFields {
    values: BTreeMap<Channel, f64>,
    extras: BTreeMap<String, Scalar>,
}

impl MeasurementFields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a field set holding a single channel reading.
    pub fn single(channel: Channel, value: f64) -> Self {
        let mut fields = Self::new();
        fields.set(channel, value);
        fields
    }

    /// Build a field set from raw payload entries, applying the channel remap.
    pub fn from_raw<K, I>(entries: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Scalar)>,
    {
        let mut fields = Self::new();
        for (key, value) in entries {
            fields.insert_raw(key.as_ref(), value);
        }
        fields
    }

    /// Insert one raw payload entry.
    ///
    /// Channel ids and channel names land on the named field when the value
    /// is numeric; every other key is kept verbatim as an extra.
    pub fn insert_raw(&mut self, key: &str, value: Scalar) {
        match (Channel::from_key(key), value.as_f64()) {
            (Some(channel), Some(number)) => {
                self.values.insert(channel, number);
            }
            _ => {
                self.extras.insert(key.to_string(), value);
            }
        }
    }

    /// Set a channel reading.
    pub fn set(&mut self, channel: Channel, value: f64) {
        self.values.insert(channel, value);
    }

    /// Get a channel reading.
    pub fn get(&self, channel: Channel) -> Option<f64> {
        self.values.get(&channel).copied()
    }

    /// Get a channel reading, defaulting absent channels to zero.
    pub fn get_or_zero(&self, channel: Channel) -> f64 {
        self.get(channel).unwrap_or(0.0)
    }

    /// Get a pass-through value.
    pub fn extra(&self, key: &str) -> Option<&Scalar> {
        self.extras.get(key)
    }

    /// Iterate channel readings in device id order.
    pub fn readings(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        self.values.iter().map(|(c, v)| (*c, *v))
    }

    /// Iterate pass-through values.
    pub fn extras(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.extras.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of channel readings present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when neither readings nor extras are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.extras.is_empty()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MeasurementFields {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.values.len() + self.extras.len()))?;
        for (channel, value) in &self.values {
            map.serialize_entry(channel.field_name(), value)?;
        }
        for (key, value) in &self.extras {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for MeasurementFields {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Nulls are dropped rather than failing the whole payload.
        let raw = BTreeMap::<String, Option<Scalar>>::deserialize(deserializer)?;
        Ok(Self::from_raw(raw.into_iter().filter_map(|(k, v)| v.map(|v| (k, v)))))
    }
}
