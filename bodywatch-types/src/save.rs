//! Backend payloads for persisted measurements.

use crate::{AthleteProfile, Channel, FinalMeasurement, MeasurementFields, ProfileStamp};

/// Body of a save request: one finalized record plus the session user.
///
/// Channels absent from the record are sent as `0`. Age and weight are
/// omitted when unknown so the backend applies its own defaults.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SaveMeasurement {
    #[cfg_attr(feature = "serde", serde(rename = "user_id"))]
    pub user_id: u64,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub age: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub weight: Option<f64>,
    pub crown_height: f64,
    pub shoulder_height: f64,
    pub elbow_reach: f64,
    pub hip_height: f64,
    pub hand_reach: f64,
    pub knee_height: f64,
    pub ankle_height: f64,
}

impl SaveMeasurement {
    /// Build the payload for a finalized record.
    pub fn from_record(user_id: u64, record: &FinalMeasurement) -> Self {
        let f = &record.fields;
        Self {
            user_id,
            name: record.profile.name.clone(),
            age: record.profile.age_years(),
            weight: record.profile.weight_kg(),
            crown_height: f.get_or_zero(Channel::CrownHeight),
            shoulder_height: f.get_or_zero(Channel::ShoulderHeight),
            elbow_reach: f.get_or_zero(Channel::ElbowReach),
            hip_height: f.get_or_zero(Channel::HipHeight),
            hand_reach: f.get_or_zero(Channel::HandReach),
            knee_height: f.get_or_zero(Channel::KneeHeight),
            ankle_height: f.get_or_zero(Channel::AnkleHeight),
        }
    }

    /// The value sent for a channel.
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::CrownHeight => self.crown_height,
            Channel::ShoulderHeight => self.shoulder_height,
            Channel::ElbowReach => self.elbow_reach,
            Channel::HipHeight => self.hip_height,
            Channel::HandReach => self.hand_reach,
            Channel::KneeHeight => self.knee_height,
            Channel::AnkleHeight => self.ankle_height,
        }
    }
}

/// A measurement row as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct StoredMeasurement {
    pub id: Option<u64>,
    #[cfg_attr(feature = "serde", serde(rename = "user_id"))]
    pub user_id: Option<u64>,
    pub date: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::text"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::u32"))]
    pub age: Option<u32>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub weight: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub crown_height: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub shoulder_height: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub elbow_reach: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub hip_height: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub hand_reach: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub knee_height: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "crate::lenient::f64"))]
    pub ankle_height: Option<f64>,
}

impl StoredMeasurement {
    /// The channel readings present in this row.
    pub fn fields(&self) -> MeasurementFields {
        let mut fields = MeasurementFields::new();
        let columns = [
            (Channel::CrownHeight, self.crown_height),
            (Channel::ShoulderHeight, self.shoulder_height),
            (Channel::ElbowReach, self.elbow_reach),
            (Channel::HipHeight, self.hip_height),
            (Channel::HandReach, self.hand_reach),
            (Channel::KneeHeight, self.knee_height),
            (Channel::AnkleHeight, self.ankle_height),
        ];
        for (channel, value) in columns {
            if let Some(value) = value {
                fields.set(channel, value);
            }
        }
        fields
    }

    /// The profile saved with this row. Columns the row lacks are taken
    /// from `fallback`.
    pub fn profile_stamp(&self, fallback: &AthleteProfile) -> ProfileStamp {
        let stamp = ProfileStamp::from_profile(fallback);
        ProfileStamp {
            name: self.name.clone().unwrap_or(stamp.name),
            age: self.age.map(|a| a.to_string()).unwrap_or(stamp.age),
            weight: self.weight.map(|w| w.to_string()).unwrap_or(stamp.weight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaptureTime, ProfileStamp, RecordId};

    fn record(fields: MeasurementFields) -> FinalMeasurement {
        FinalMeasurement {
            id: RecordId(1),
            fields,
            captured: CaptureTime::default(),
            profile: ProfileStamp::default(),
        }
    }

    #[test]
    fn test_absent_channels_default_to_zero() {
        let mut fields = MeasurementFields::new();
        fields.set(Channel::CrownHeight, 120.5);
        fields.set(Channel::HipHeight, 90.0);

        let save = SaveMeasurement::from_record(3, &record(fields));
        assert_eq!(save.user_id, 3);
        assert_eq!(save.crown_height, 120.5);
        assert_eq!(save.hip_height, 90.0);
        for channel in [
            Channel::ShoulderHeight,
            Channel::ElbowReach,
            Channel::HandReach,
            Channel::KneeHeight,
            Channel::AnkleHeight,
        ] {
            assert_eq!(save.value(channel), 0.0);
        }
        assert_eq!(save.name, "User");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_wire_names() {
        let save = SaveMeasurement::from_record(
            9,
            &record(MeasurementFields::single(Channel::AnkleHeight, 18.5)),
        );
        let json = serde_json::to_value(&save).unwrap();
        assert_eq!(json["user_id"], 9);
        assert_eq!(json["ankleHeight"], 18.5);
        assert_eq!(json["crownHeight"], 0.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_unknown_age_and_weight_are_omitted() {
        let save = SaveMeasurement::from_record(1, &record(MeasurementFields::new()));
        assert_eq!(save.age, None);
        assert_eq!(save.weight, None);

        let json = serde_json::to_value(&save).unwrap();
        let body = json.as_object().unwrap();
        assert!(!body.contains_key("age"));
        assert!(!body.contains_key("weight"));
        assert_eq!(json["name"], "User");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_profile_values_are_sent_as_numbers() {
        let mut done = record(MeasurementFields::new());
        done.profile = ProfileStamp::from_profile(&AthleteProfile::new("Ada", 31, 64.5));

        let json = serde_json::to_value(SaveMeasurement::from_record(1, &done)).unwrap();
        assert_eq!(json["age"], 31);
        assert_eq!(json["weight"], 64.5);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_stored_row_tolerates_missing_columns() {
        let row: StoredMeasurement =
            serde_json::from_str(r#"{"id": 4, "user_id": 1, "kneeHeight": "48.00", "extra": "x"}"#)
                .unwrap();
        let fields = row.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get(Channel::KneeHeight), Some(48.0));
        assert_eq!(row.name, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_stored_row_keeps_its_own_profile() {
        let row: StoredMeasurement = serde_json::from_str(
            r#"{"id": 5, "name": "Ada", "age": 31, "weight": "64.50", "hipHeight": 90}"#,
        )
        .unwrap();
        let current = AthleteProfile::new("Grace", 45, 80.0);

        let stamp = row.profile_stamp(&current);
        assert_eq!(stamp.name, "Ada");
        assert_eq!(stamp.age, "31");
        assert_eq!(stamp.weight, "64.5");

        let bare = StoredMeasurement::default();
        assert_eq!(bare.profile_stamp(&current), ProfileStamp::from_profile(&current));
    }
}
