//! Activity test catalogue and results.

use core::fmt;
use core::str::FromStr;

use std::collections::BTreeMap;

use crate::{CaptureTime, RecordId, Scalar};

/// A physical performance test the device can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Activity {
    #[cfg_attr(feature = "serde", serde(rename = "1030_sprint"))]
    Sprint1030,
    #[cfg_attr(feature = "serde", serde(rename = "300_yard_shuttle"))]
    YardShuttle300,
    #[cfg_attr(feature = "serde", serde(rename = "3gaterunning"))]
    ThreeGateRunning,
    #[cfg_attr(feature = "serde", serde(rename = "3run"))]
    ThreeRun,
    #[cfg_attr(feature = "serde", serde(rename = "505_agility"))]
    Agility505,
    #[cfg_attr(feature = "serde", serde(rename = "5105_agility"))]
    Agility5105,
    #[cfg_attr(feature = "serde", serde(rename = "broadjump"))]
    BroadJump,
    #[cfg_attr(feature = "serde", serde(rename = "dropjump"))]
    DropJump,
    #[cfg_attr(feature = "serde", serde(rename = "jump"))]
    Jump,
    #[cfg_attr(feature = "serde", serde(rename = "reflex"))]
    Reflex,
    #[cfg_attr(feature = "serde", serde(rename = "running_speed"))]
    RunningSpeed,
    #[cfg_attr(feature = "serde", serde(rename = "sprint"))]
    Sprint,
    #[cfg_attr(feature = "serde", serde(rename = "t_test"))]
    TTest,
    #[cfg_attr(feature = "serde", serde(rename = "yoyo"))]
    Yoyo,
}

impl Activity {
    pub const ALL: [Activity; 14] = [
        Activity::Sprint1030,
        Activity::YardShuttle300,
        Activity::ThreeGateRunning,
        Activity::ThreeRun,
        Activity::Agility505,
        Activity::Agility5105,
        Activity::BroadJump,
        Activity::DropJump,
        Activity::Jump,
        Activity::Reflex,
        Activity::RunningSpeed,
        Activity::Sprint,
        Activity::TTest,
        Activity::Yoyo,
    ];

    /// Stable identifier used on the wire and in caches.
    pub fn key(self) -> &'static str {
        match self {
            Activity::Sprint1030 => "1030_sprint",
            Activity::YardShuttle300 => "300_yard_shuttle",
            Activity::ThreeGateRunning => "3gaterunning",
            Activity::ThreeRun => "3run",
            Activity::Agility505 => "505_agility",
            Activity::Agility5105 => "5105_agility",
            Activity::BroadJump => "broadjump",
            Activity::DropJump => "dropjump",
            Activity::Jump => "jump",
            Activity::Reflex => "reflex",
            Activity::RunningSpeed => "running_speed",
            Activity::Sprint => "sprint",
            Activity::TTest => "t_test",
            Activity::Yoyo => "yoyo",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Activity::Sprint1030 => "1030 Sprint",
            Activity::YardShuttle300 => "300 Yard Shuttle",
            Activity::ThreeGateRunning => "3Gate Running",
            Activity::ThreeRun => "3Run",
            Activity::Agility505 => "505 Agility",
            Activity::Agility5105 => "5105 Agility",
            Activity::BroadJump => "Broad Jump",
            Activity::DropJump => "Drop Jump",
            Activity::Jump => "Jump",
            Activity::Reflex => "Reflex",
            Activity::RunningSpeed => "Running Speed",
            Activity::Sprint => "Sprint",
            Activity::TTest => "T-Test",
            Activity::Yoyo => "Yoyo",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown activity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActivity(pub String);

impl fmt::Display for UnknownActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown activity: {}", self.0)
    }
}

impl std::error::Error for UnknownActivity {}

impl FromStr for Activity {
    type Err = UnknownActivity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Activity::ALL
            .into_iter()
            .find(|a| a.key() == s || a.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownActivity(s.to_string()))
    }
}

/// The result of one activity test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivityRecord {
    pub id: RecordId,
    pub activity: Activity,
    /// Whatever the device reported for the test, keyed as sent.
    pub results: BTreeMap<String, Scalar>,
    pub captured: CaptureTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_keys_are_unique() {
        let mut keys: Vec<_> = Activity::ALL.iter().map(|a| a.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 14);
    }

    #[test]
    fn test_parse_by_key_or_label() {
        assert_eq!("505_agility".parse::<Activity>(), Ok(Activity::Agility505));
        assert_eq!("t-test".parse::<Activity>(), Ok(Activity::TTest));
        assert!("swimming".parse::<Activity>().is_err());
    }
}
