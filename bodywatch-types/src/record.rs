//! Live and finalized measurement records.

use core::fmt;

use crate::{AthleteProfile, MeasurementFields};

/// Permanent identifier of a finalized record.
///
/// Millisecond timestamp at finalization, kept strictly increasing by the
/// allocator that hands them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side capture time of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureTime {
    /// Local date, e.g. `2026-10-18`.
    pub date: String,
    /// Local time of day, e.g. `14:03:27`.
    pub time: String,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// Display-only profile values copied onto a record when it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileStamp {
    pub name: String,
    pub age: String,
    pub weight: String,
}

impl ProfileStamp {
    /// Stamp the current profile, substituting placeholders for gaps.
    pub fn from_profile(profile: &AthleteProfile) -> Self {
        Self {
            name: profile.name.clone().unwrap_or_else(|| "User".to_string()),
            age: profile.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()),
            weight: profile.weight.map(|w| w.to_string()).unwrap_or_else(|| "-".to_string()),
        }
    }

    /// Age in years, if the stamp carries one.
    pub fn age_years(&self) -> Option<u32> {
        self.age.trim().parse().ok()
    }

    /// Weight in kilograms, if the stamp carries one.
    pub fn weight_kg(&self) -> Option<f64> {
        self.weight.trim().parse().ok().filter(|w: &f64| w.is_finite())
    }
}

impl Default for ProfileStamp {
    fn default() -> Self {
        Self::from_profile(&AthleteProfile::default())
    }
}

/// A measurement still being reported by the device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LiveMeasurement {
    pub fields: MeasurementFields,
    pub captured: CaptureTime,
    pub profile: ProfileStamp,
}

/// A completed measurement. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FinalMeasurement {
    pub id: RecordId,
    pub fields: MeasurementFields,
    pub captured: CaptureTime,
    pub profile: ProfileStamp,
}

/// A body measurement in either of its two states.
///
/// The only transition is `Live -> Final`.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementRecord {
    Live(LiveMeasurement),
    Final(FinalMeasurement),
}

impl MeasurementRecord {
    /// The field set, regardless of state.
    pub fn fields(&self) -> &MeasurementFields {
        match self {
            MeasurementRecord::Live(live) => &live.fields,
            MeasurementRecord::Final(done) => &done.fields,
        }
    }

    /// Capture time, regardless of state.
    pub fn captured(&self) -> &CaptureTime {
        match self {
            MeasurementRecord::Live(live) => &live.captured,
            MeasurementRecord::Final(done) => &done.captured,
        }
    }

    /// Permanent id, if finalized.
    pub fn id(&self) -> Option<RecordId> {
        match self {
            MeasurementRecord::Live(_) => None,
            MeasurementRecord::Final(done) => Some(done.id),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, MeasurementRecord::Live(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Channel;

    #[test]
    fn test_profile_stamp_placeholders() {
        let stamp = ProfileStamp::from_profile(&AthleteProfile::default());
        assert_eq!(stamp.name, "User");
        assert_eq!(stamp.age, "-");
        assert_eq!(stamp.weight, "-");

        let profile = AthleteProfile::new("Ada", 31, 64.5);
        let stamp = ProfileStamp::from_profile(&profile);
        assert_eq!(stamp.name, "Ada");
        assert_eq!(stamp.age, "31");
        assert_eq!(stamp.weight, "64.5");
        assert_eq!(stamp.age_years(), Some(31));
        assert_eq!(stamp.weight_kg(), Some(64.5));
    }

    #[test]
    fn test_placeholders_have_no_numeric_value() {
        let stamp = ProfileStamp::default();
        assert_eq!(stamp.age_years(), None);
        assert_eq!(stamp.weight_kg(), None);
    }

    #[test]
    fn test_record_accessors() {
        let live = MeasurementRecord::Live(LiveMeasurement {
            fields: MeasurementFields::single(Channel::KneeHeight, 50.0),
            captured: CaptureTime::default(),
            profile: ProfileStamp::default(),
        });
        assert!(live.is_live());
        assert_eq!(live.id(), None);
        assert_eq!(live.fields().get(Channel::KneeHeight), Some(50.0));

        let done = MeasurementRecord::Final(FinalMeasurement {
            id: RecordId(7),
            fields: MeasurementFields::new(),
            captured: CaptureTime::default(),
            profile: ProfileStamp::default(),
        });
        assert!(!done.is_live());
        assert_eq!(done.id(), Some(RecordId(7)));
    }
}
