//! Deserializers for backend rows.
//!
//! MySQL `DECIMAL` and some integer columns arrive as JSON strings. These
//! accept either form and treat anything unparseable as absent.

use serde::{Deserialize, Deserializer};

use crate::Scalar;

pub(crate) fn f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

pub(crate) fn u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64(deserializer)?;
    Ok(value
        .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Scalar::Text(s) if !s.trim().is_empty() => Some(s),
        Scalar::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}
