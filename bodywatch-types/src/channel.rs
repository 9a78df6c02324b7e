//! Sensor channels and their named measurement fields.

use core::fmt;

/// A body dimension measured by one sensor channel.
///
/// The device reports readings keyed by the numeric channel id (1-7);
/// everything downstream uses the camelCase field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    CrownHeight,
    ShoulderHeight,
    ElbowReach,
    HipHeight,
    HandReach,
    KneeHeight,
    AnkleHeight,
}

impl Channel {
    /// All channels in device id order.
    pub const ALL: [Channel; 7] = [
        Channel::CrownHeight,
        Channel::ShoulderHeight,
        Channel::ElbowReach,
        Channel::HipHeight,
        Channel::HandReach,
        Channel::KneeHeight,
        Channel::AnkleHeight,
    ];

    /// Look up a channel by its device id.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Channel::CrownHeight),
            2 => Some(Channel::ShoulderHeight),
            3 => Some(Channel::ElbowReach),
            4 => Some(Channel::HipHeight),
            5 => Some(Channel::HandReach),
            6 => Some(Channel::KneeHeight),
            7 => Some(Channel::AnkleHeight),
            _ => None,
        }
    }

    /// Resolve a payload key: either a channel id (`"1"`..`"7"`) or the
    /// field's own camelCase name.
    ///
    /// Returns `None` for keys that are not channels (`weight`, `name`, ...),
    /// which callers pass through unchanged.
    pub fn from_key(key: &str) -> Option<Self> {
        if let Ok(id) = key.trim().parse::<u8>() {
            return Self::from_id(id);
        }
        Self::ALL.into_iter().find(|c| c.field_name() == key)
    }

    /// The device id for this channel.
    pub fn id(self) -> u8 {
        match self {
            Channel::CrownHeight => 1,
            Channel::ShoulderHeight => 2,
            Channel::ElbowReach => 3,
            Channel::HipHeight => 4,
            Channel::HandReach => 5,
            Channel::KneeHeight => 6,
            Channel::AnkleHeight => 7,
        }
    }

    /// The camelCase field name used in records and REST payloads.
    pub fn field_name(self) -> &'static str {
        match self {
            Channel::CrownHeight => "crownHeight",
            Channel::ShoulderHeight => "shoulderHeight",
            Channel::ElbowReach => "elbowReach",
            Channel::HipHeight => "hipHeight",
            Channel::HandReach => "handReach",
            Channel::KneeHeight => "kneeHeight",
            Channel::AnkleHeight => "ankleHeight",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Channel::CrownHeight => "Crown Height",
            Channel::ShoulderHeight => "Shoulder Height",
            Channel::ElbowReach => "Elbow Reach",
            Channel::HipHeight => "Hip Height",
            Channel::HandReach => "Hand Reach",
            Channel::KneeHeight => "Knee Height",
            Channel::AnkleHeight => "Ankle Height (manual)",
        }
    }

    /// Whether this channel has no sensor and must be entered by hand.
    pub fn requires_manual_entry(self) -> bool {
        self == Channel::AnkleHeight
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}
