//! REST client for the measurement backend.
//!
//! The backend exposes four routes:
//!
//! - `POST /api/register` - create an account
//! - `POST /api/login` - exchange credentials for the user row
//! - `POST /api/measurements` - store one finalized measurement
//! - `GET /api/measurements/{user_id}` - list a user's stored measurements
//!
//! ## Example
//!
//! ```rust,no_run
//! use bodywatch_adapters::BackendClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BackendClient::builder()
//!         .base_url("http://localhost:5000")
//!         .build()?;
//!
//!     let user = client.login("ada@example.com", "secret").await?;
//!     let rows = client.fetch_measurements(user.id).await?;
//!     println!("{} stored measurements", rows.len());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use bodywatch_types::{SaveMeasurement, SessionUser, StoredMeasurement};

use crate::AdapterError;

/// Destination for finalized measurements.
///
/// Implemented by [`BackendClient`]; the persistence queue only depends on
/// this trait so it can be exercised without a server.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Store one measurement.
    async fn save(&self, measurement: &SaveMeasurement) -> Result<(), AdapterError>;
}

/// Registration form.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub age: u32,
    pub weight: f64,
    pub email: String,
    pub password: String,
}

/// HTTP client for the measurement backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> BackendClientBuilder {
        BackendClientBuilder::default()
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create an account.
    pub async fn register(&self, registration: &Registration) -> Result<(), AdapterError> {
        let url = format!("{}/api/register", self.base_url);
        let response = self.client.post(&url).json(registration).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Log in and return the user row.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, AdapterError> {
        let url = format!("{}/api/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&Credentials { email, password })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AdapterError::Auth("Invalid credentials".to_string()));
        }

        let body: LoginResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(body.into_user())
    }

    /// Store one finalized measurement.
    pub async fn save_measurement(&self, measurement: &SaveMeasurement) -> Result<(), AdapterError> {
        let url = format!("{}/api/measurements", self.base_url);
        let response = self.client.post(&url).json(measurement).send().await?;
        check_status(response).await?;
        debug!(user_id = measurement.user_id, "measurement stored");
        Ok(())
    }

    /// List a user's stored measurements, newest first.
    pub async fn fetch_measurements(
        &self,
        user_id: u64,
    ) -> Result<Vec<StoredMeasurement>, AdapterError> {
        let url = format!("{}/api/measurements/{}", self.base_url, user_id);
        let response = self.client.get(&url).send().await?;

        let body: serde_json::Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        // Anything other than an array is treated as "no history".
        match body {
            serde_json::Value::Array(_) => {
                serde_json::from_value(body).map_err(|e| AdapterError::Parse(e.to_string()))
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl MeasurementSink for BackendClient {
    async fn save(&self, measurement: &SaveMeasurement) -> Result<(), AdapterError> {
        self.save_measurement(measurement).await
    }
}

/// Builder for [`BackendClient`].
#[derive(Debug, Default)]
pub struct BackendClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl BackendClientBuilder {
    /// Set the backend base URL (e.g., "http://localhost:5000").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<BackendClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Config(e.to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| "http://localhost:5000".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(BackendClient { client, base_url })
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Login answers either `{"user": {...}}` or the bare user row.
#[derive(Deserialize)]
#[serde(untagged)]
enum LoginResponse {
    Wrapped { user: SessionUser },
    Bare(SessionUser),
}

impl LoginResponse {
    fn into_user(self) -> SessionUser {
        match self {
            LoginResponse::Wrapped { user } | LoginResponse::Bare(user) => user,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Map non-success statuses to errors, keeping the backend's message.
async fn check_status(response: Response) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("API returned status {}", status));

    if status.is_server_error() {
        Err(AdapterError::Http(message))
    } else {
        Err(AdapterError::Rejected(message))
    }
}
