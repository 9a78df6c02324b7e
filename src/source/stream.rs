//! Stream-based device link.
//!
//! Receives newline-delimited frames from an async byte stream. This is
//! useful for replaying a captured session from a file or for a TCP
//! bridge in front of the rig. The link is receive-only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use super::{DeviceCommand, DeviceLink, LinkError};

/// A device link that reads frames from an async stream.
///
/// This link spawns a background task that reads lines from the provided
/// async reader and makes each non-empty line available via `poll()`.
///
/// # Example with a byte stream
///
/// ```
/// use std::io::Cursor;
/// use bodywatch::StreamLink;
///
/// # tokio_test::block_on(async {
/// let data = b"{\"type\":\"done\",\"data\":{\"1\":120.5}}\n";
/// let stream = Cursor::new(data.to_vec());
/// let link = StreamLink::spawn(stream, "capture.jsonl");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamLink {
    receiver: mpsc::Receiver<String>,
    description: String,
    open: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl StreamLink {
    /// Spawn a background task that reads from the given async reader.
    ///
    /// Each line is forwarded verbatim as one frame; blank lines are skipped.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        let open = Arc::new(AtomicBool::new(true));
        let last_error = Arc::new(Mutex::new(None));
        let open_handle = open.clone();
        let error_handle = last_error.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        // EOF
                        *error_handle.lock() = Some("Stream ended".to_string());
                        break;
                    }
                    Ok(_) => {
                        let frame = line.trim();
                        if frame.is_empty() {
                            continue;
                        }
                        if tx.send(frame.to_string()).await.is_err() {
                            // Receiver dropped
                            break;
                        }
                    }
                    Err(e) => {
                        *error_handle.lock() = Some(format!("Read error: {}", e));
                        break;
                    }
                }
            }

            debug!("stream link reader finished");
            open_handle.store(false, Ordering::SeqCst);
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            open,
            last_error,
        }
    }

    /// True once the reader has finished and every frame has been polled.
    pub fn is_drained(&self) -> bool {
        !self.open.load(Ordering::SeqCst) && self.receiver.is_empty()
    }
}

impl DeviceLink for StreamLink {
    fn poll(&mut self) -> Option<String> {
        // Try to receive without blocking
        match self.receiver.try_recv() {
            Ok(frame) => Some(frame),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => None,
        }
    }

    fn send(&self, _command: &DeviceCommand) -> Result<(), LinkError> {
        Err(LinkError::ReadOnly(self.description.clone()))
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn done_frame() -> &'static str {
        r#"{"type":"done","data":{"1":120.5,"4":90.0}}"#
    }

    #[tokio::test]
    async fn test_stream_link_spawn() {
        let data = format!("{}\n", done_frame());
        let mut link = StreamLink::spawn(Cursor::new(data), "test");

        // Give the background task time to process
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(link.poll().as_deref(), Some(done_frame()));
        assert!(link.poll().is_none());
    }

    #[tokio::test]
    async fn test_stream_link_skips_blank_lines_and_keeps_garbage() {
        let data = format!("\n   \nnot json\n{}\n", done_frame());
        let mut link = StreamLink::spawn(Cursor::new(data), "test");

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        // Garbage is passed through; decoding decides what to drop.
        assert_eq!(link.poll().as_deref(), Some("not json"));
        assert_eq!(link.poll().as_deref(), Some(done_frame()));
        assert!(link.poll().is_none());
    }

    #[tokio::test]
    async fn test_stream_link_description() {
        let link = StreamLink::spawn(Cursor::new(""), "capture.jsonl");
        assert_eq!(link.description(), "stream: capture.jsonl");
    }

    #[tokio::test]
    async fn test_stream_link_closes_at_eof() {
        let mut link = StreamLink::spawn(Cursor::new(""), "test");

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert!(link.poll().is_none());
        assert!(!link.is_connected());
        assert!(link.is_drained());
        assert_eq!(link.last_error().as_deref(), Some("Stream ended"));
    }

    #[tokio::test]
    async fn test_stream_link_is_receive_only() {
        let link = StreamLink::spawn(Cursor::new(""), "test");
        assert!(matches!(
            link.send(&DeviceCommand::StartMeasurement),
            Err(LinkError::ReadOnly(_))
        ));
    }
}
