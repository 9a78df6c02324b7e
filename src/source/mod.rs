//! Device link abstraction for receiving measurement frames.
//!
//! This module provides a trait-based abstraction over the connection to
//! the sensor rig. A link delivers raw text frames and accepts outbound
//! commands; decoding frames into [`DeviceMessage`]s is left to the
//! reconciler so malformed input can be dropped in one place.

mod channel;
mod frame;
mod stream;
mod websocket;

pub use channel::ChannelLink;
pub use frame::{fields_from_value, parse_frame, scalars_from_value, DeviceMessage};
pub use stream::StreamLink;
pub use websocket::{device_url, WebSocketLink};

use std::fmt::Debug;

use bodywatch_types::Channel;
use thiserror::Error;

/// Sentinel that starts a body measurement on the device.
pub const START_MEASUREMENT: &str = "START_MEASUREMENT";

/// Errors raised by a device link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The link is not (or no longer) connected; the command was dropped.
    #[error("device is not connected")]
    NotConnected,

    /// Opening the connection failed.
    #[error("could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The link only receives frames.
    #[error("link is receive-only: {0}")]
    ReadOnly(String),

    /// The connection closed while waiting for a reply.
    #[error("connection closed")]
    Closed,
}

/// A command sent to the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Begin a body measurement.
    StartMeasurement,
    /// Capture the given channel next.
    SelectChannel(Channel),
    /// Announce this client after connecting.
    Hello { client_id: String },
    /// Begin an activity measurement.
    StartActivity,
}

impl DeviceCommand {
    /// The text frame sent on the wire.
    pub fn to_frame(&self) -> String {
        match self {
            DeviceCommand::StartMeasurement => START_MEASUREMENT.to_string(),
            DeviceCommand::SelectChannel(channel) => channel.id().to_string(),
            DeviceCommand::Hello { client_id } => serde_json::json!({
                "type": "UI_CLIENT_CONNECTED",
                "clientId": client_id,
            })
            .to_string(),
            DeviceCommand::StartActivity => "activity".to_string(),
        }
    }
}

/// Trait for exchanging frames with the sensor rig.
///
/// Implementations move bytes on background tasks; `poll` never blocks so
/// the single event-handling context can drain frames between commands.
///
/// # Example
///
/// ```
/// use bodywatch::{ChannelLink, DeviceLink};
///
/// let (tx, mut link) = ChannelLink::create("bench");
/// tx.try_send(r#"{"type":"done","data":{"1":120.5}}"#.to_string()).unwrap();
/// assert!(link.poll().is_some());
/// ```
pub trait DeviceLink: Send + Debug {
    /// Take the next received text frame, if any.
    fn poll(&mut self) -> Option<String>;

    /// Send a command. Fails immediately when disconnected; never queues.
    fn send(&self, command: &DeviceCommand) -> Result<(), LinkError>;

    /// Whether the link is currently open.
    fn is_connected(&self) -> bool;

    /// Returns a human-readable description of the link.
    fn description(&self) -> &str;

    /// The last transport error, if any.
    fn last_error(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_frames() {
        assert_eq!(DeviceCommand::StartMeasurement.to_frame(), "START_MEASUREMENT");
        assert_eq!(DeviceCommand::SelectChannel(Channel::HipHeight).to_frame(), "4");
        assert_eq!(DeviceCommand::StartActivity.to_frame(), "activity");

        let hello = DeviceCommand::Hello {
            client_id: "webapp_42".to_string(),
        }
        .to_frame();
        let value: serde_json::Value = serde_json::from_str(&hello).unwrap();
        assert_eq!(value["type"], "UI_CLIENT_CONNECTED");
        assert_eq!(value["clientId"], "webapp_42");
    }
}
