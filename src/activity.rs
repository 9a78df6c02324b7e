//! One-shot activity tests.
//!
//! An activity run opens its own connection to the device, asks for an
//! activity measurement and waits for a single result frame.

use std::collections::BTreeMap;
use std::time::Duration;

use bodywatch_types::{Activity, ActivityRecord, RecordId, Scalar};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::data::capture_now;
use crate::source::{scalars_from_value, DeviceCommand, LinkError};

/// Default time to wait for the device to report a result.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("select an activity before starting a measurement")]
    NoActivity,

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("device did not report a result within {0:?}")]
    Timeout(Duration),

    #[error("device sent an invalid result: {0}")]
    InvalidResult(String),

    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Run one activity test against the device at `url`.
pub async fn run_activity(
    url: &str,
    activity: Option<Activity>,
    timeout: Duration,
) -> Result<ActivityRecord, ActivityError> {
    let activity = activity.ok_or(ActivityError::NoActivity)?;
    info!(%activity, %url, "starting activity measurement");

    let results = tokio::time::timeout(timeout, exchange(url))
        .await
        .map_err(|_| ActivityError::Timeout(timeout))??;

    let captured = capture_now();
    info!(%activity, readings = results.len(), "activity measurement complete");
    Ok(ActivityRecord {
        id: RecordId(captured.timestamp_ms),
        activity,
        results,
        captured,
    })
}

async fn exchange(url: &str) -> Result<BTreeMap<String, Scalar>, ActivityError> {
    let (mut socket, _) =
        tokio_tungstenite::connect_async(url).await.map_err(|e| LinkError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    socket.send(Message::Text(DeviceCommand::StartActivity.to_frame())).await?;

    let text = loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Close(_))) | None => return Err(LinkError::Closed.into()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    };
    debug!(frame = %text, "activity result");
    let _ = socket.close(None).await;

    match serde_json::from_str::<Value>(&text) {
        Ok(value @ Value::Object(_)) => Ok(scalars_from_value(value)),
        Ok(_) => Err(ActivityError::InvalidResult("expected a JSON object".to_string())),
        Err(e) => Err(ActivityError::InvalidResult(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Serve one connection: expect the activity command, then reply.
    async fn device(reply: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let command = ws.next().await.unwrap().unwrap();
            assert_eq!(command.to_text().unwrap(), "activity");
            match reply {
                Some(reply) => {
                    ws.send(Message::Text(reply.to_string())).await.unwrap();
                    // Wait for the client to hang up
                    while let Some(Ok(_)) = ws.next().await {}
                }
                None => tokio::time::sleep(Duration::from_secs(5)).await,
            }
        });

        format!("ws://{}/", addr)
    }

    #[tokio::test]
    async fn test_activity_result_recorded() {
        let url = device(Some(r#"{"time": 4.2, "distance": "30"}"#)).await;

        let record = run_activity(&url, Some(Activity::Sprint), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(record.activity, Activity::Sprint);
        assert_eq!(record.results.get("time"), Some(&Scalar::Number(4.2)));
        assert_eq!(record.results.get("distance").and_then(Scalar::as_f64), Some(30.0));
        assert_eq!(record.id.0, record.captured.timestamp_ms);
    }

    #[tokio::test]
    async fn test_numeric_keys_are_kept() {
        let url = device(Some(r#"{"1": 2.31, "2": 2.29, "best": "1"}"#)).await;

        let record = run_activity(&url, Some(Activity::Sprint1030), Duration::from_secs(5))
            .await
            .unwrap();

        let keys: Vec<_> = record.results.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1", "2", "best"]);
        assert_eq!(record.results["1"], Scalar::Number(2.31));
    }

    #[tokio::test]
    async fn test_no_activity_selected() {
        // No server: rejection happens before any connection attempt.
        let err = run_activity("ws://127.0.0.1:1/", None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::NoActivity));
    }

    #[tokio::test]
    async fn test_timeout() {
        let url = device(None).await;
        let err = run_activity(&url, Some(Activity::Yoyo), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_non_object_result() {
        let url = device(Some("[1, 2, 3]")).await;
        let err = run_activity(&url, Some(Activity::Jump), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::InvalidResult(_)));
    }
}
