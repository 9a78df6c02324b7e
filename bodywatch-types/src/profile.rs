//! Athlete profile and logged-in user.

/// The athlete whose measurements are being recorded.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AthleteProfile {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub age: Option<u32>,
    /// Body weight in kilograms.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight: Option<f64>,
}

impl AthleteProfile {
    /// Create a fully populated profile.
    pub fn new(name: impl Into<String>, age: u32, weight: f64) -> Self {
        Self {
            name: Some(name.into()),
            age: Some(age),
            weight: Some(weight),
        }
    }

    /// A profile is complete once name, age and weight are all known.
    pub fn is_complete(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
            && self.age.is_some()
            && self.weight.is_some()
    }
}

/// A user account as returned by the backend on login.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionUser {
    pub id: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub email: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "crate::lenient::u32"))]
    pub age: Option<u32>,
    /// The `users.weight` column is a decimal and may arrive as a string.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "crate::lenient::f64"))]
    pub weight: Option<f64>,
}

impl SessionUser {
    /// The athlete profile carried on the account.
    pub fn profile(&self) -> AthleteProfile {
        AthleteProfile {
            name: self.name.clone(),
            age: self.age,
            weight: self.weight,
        }
    }
}
