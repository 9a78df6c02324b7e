//! Channel-based device link.
//!
//! Receives frames via a tokio mpsc channel and records outbound commands
//! on another. Useful for bridging frames from elsewhere (a serial reader,
//! a test harness) without a socket.

use tokio::sync::mpsc;

use super::{DeviceCommand, DeviceLink, LinkError};

/// A device link backed by in-memory channels.
///
/// # Example
///
/// ```
/// use bodywatch::ChannelLink;
///
/// // Create a channel pair
/// let (tx, link) = ChannelLink::create("serial:/dev/ttyUSB0");
/// ```
#[derive(Debug)]
pub struct ChannelLink {
    receiver: mpsc::Receiver<String>,
    commands: Option<mpsc::UnboundedSender<DeviceCommand>>,
    description: String,
    connected: bool,
    last_error: Option<String>,
}

impl ChannelLink {
    /// Create a new channel link.
    ///
    /// # Arguments
    ///
    /// * `receiver` - The receiving end of a frame channel
    /// * `commands` - Where outbound commands go; `None` makes the link receive-only
    /// * `source_description` - A description of where frames come from
    pub fn new(
        receiver: mpsc::Receiver<String>,
        commands: Option<mpsc::UnboundedSender<DeviceCommand>>,
        source_description: &str,
    ) -> Self {
        Self {
            receiver,
            commands,
            description: format!("channel: {}", source_description),
            connected: true,
            last_error: None,
        }
    }

    /// Create a receive-only link and the sender that feeds it.
    pub fn create(source_description: &str) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(64);
        (tx, Self::new(rx, None, source_description))
    }

    /// Create a link that also exposes the commands sent through it.
    pub fn with_commands(
        source_description: &str,
    ) -> (mpsc::Sender<String>, mpsc::UnboundedReceiver<DeviceCommand>, Self) {
        let (tx, rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        (tx, cmd_rx, Self::new(rx, Some(cmd_tx), source_description))
    }
}

impl DeviceLink for ChannelLink {
    fn poll(&mut self) -> Option<String> {
        match self.receiver.try_recv() {
            Ok(frame) => Some(frame),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if self.connected {
                    self.connected = false;
                    self.last_error = Some("Channel closed".to_string());
                }
                None
            }
        }
    }

    fn send(&self, command: &DeviceCommand) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        let Some(commands) = &self.commands else {
            return Err(LinkError::ReadOnly(self.description.clone()));
        };
        commands.send(command.clone()).map_err(|_| LinkError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodywatch_types::Channel;

    #[test]
    fn test_channel_link_poll() {
        let (tx, mut link) = ChannelLink::create("test");

        // Nothing queued yet
        assert!(link.poll().is_none());

        tx.try_send("frame-1".to_string()).unwrap();
        tx.try_send("frame-2".to_string()).unwrap();
        assert_eq!(link.poll().as_deref(), Some("frame-1"));
        assert_eq!(link.poll().as_deref(), Some("frame-2"));
        assert!(link.poll().is_none());
        assert_eq!(link.description(), "channel: test");
    }

    #[test]
    fn test_channel_link_records_commands() {
        let (_tx, mut commands, link) = ChannelLink::with_commands("test");

        link.send(&DeviceCommand::StartMeasurement).unwrap();
        link.send(&DeviceCommand::SelectChannel(Channel::ElbowReach)).unwrap();

        assert_eq!(commands.try_recv().unwrap(), DeviceCommand::StartMeasurement);
        assert_eq!(
            commands.try_recv().unwrap(),
            DeviceCommand::SelectChannel(Channel::ElbowReach)
        );
    }

    #[test]
    fn test_receive_only_link_rejects_commands() {
        let (_tx, link) = ChannelLink::create("test");
        assert!(matches!(
            link.send(&DeviceCommand::StartMeasurement),
            Err(LinkError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_dropped_sender_disconnects() {
        let (tx, _commands, mut link) = ChannelLink::with_commands("test");
        drop(tx);

        assert!(link.poll().is_none());
        assert!(!link.is_connected());
        assert_eq!(link.last_error().as_deref(), Some("Channel closed"));
        assert!(matches!(
            link.send(&DeviceCommand::StartMeasurement),
            Err(LinkError::NotConnected)
        ));
    }
}
