//! WebSocket link to the sensor rig.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{DeviceCommand, DeviceLink, LinkError};

/// Build the rig's WebSocket URL from a bare host.
///
/// Inputs that already carry a `ws://` or `wss://` scheme are used as-is.
pub fn device_url(host: &str, port: u16) -> String {
    let host = host.trim();
    if host.starts_with("ws://") || host.starts_with("wss://") {
        host.to_string()
    } else {
        format!("ws://{}:{}/", host, port)
    }
}

/// A live WebSocket connection to the device.
///
/// Two background tasks own the socket halves: the reader forwards text
/// frames to `poll()`, the writer sends queued commands. Once either side
/// fails the link reports itself disconnected and rejects further commands.
#[derive(Debug)]
pub struct WebSocketLink {
    receiver: mpsc::Receiver<String>,
    commands: mpsc::UnboundedSender<DeviceCommand>,
    description: String,
    connected: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
    reader: JoinHandle<()>,
}

impl WebSocketLink {
    /// Connect to the device and announce `client_id` once open.
    pub async fn connect(url: &str, client_id: Option<String>) -> Result<Self, LinkError> {
        let (socket, _response) =
            tokio_tungstenite::connect_async(url).await.map_err(|e| LinkError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        info!(%url, "device link connected");

        let (mut sink, mut stream) = socket.split();
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<DeviceCommand>();
        let connected = Arc::new(AtomicBool::new(true));
        let last_error = Arc::new(Mutex::new(None));

        let reader_connected = connected.clone();
        let reader_error = last_error.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => continue,
                    },
                    Ok(Message::Close(_)) => {
                        *reader_error.lock() = Some("Device closed the connection".to_string());
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        *reader_error.lock() = Some(format!("Read error: {}", e));
                        break;
                    }
                };
                debug!(frame = %text, "device frame");
                if frame_tx.send(text).await.is_err() {
                    // Link dropped
                    break;
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
        });

        let writer_connected = connected.clone();
        let writer_error = last_error.clone();
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(command.to_frame())).await {
                    warn!(error = %e, "device write failed");
                    *writer_error.lock() = Some(format!("Write error: {}", e));
                    writer_connected.store(false, Ordering::SeqCst);
                    return;
                }
            }
            // Every sender is gone: the link was dropped.
            let _ = sink.close().await;
        });

        if let Some(client_id) = client_id {
            let _ = command_tx.send(DeviceCommand::Hello { client_id });
        }

        Ok(Self {
            receiver: frame_rx,
            commands: command_tx,
            description: format!("websocket: {}", url),
            connected,
            last_error,
            reader,
        })
    }
}

impl DeviceLink for WebSocketLink {
    fn poll(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    fn send(&self, command: &DeviceCommand) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.commands.send(command.clone()).map_err(|_| LinkError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl Drop for WebSocketLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
