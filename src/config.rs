//! Layered runtime settings.
//!
//! Built-in defaults, then an optional TOML file, then `BODYWATCH_*`
//! environment variables (`BODYWATCH_DEVICE__IP=192.168.0.140`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bodywatch_adapters::RetryPolicy;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::duration::serde_duration;
use crate::data::MeasuringWindow;

const ENV_PREFIX: &str = "BODYWATCH";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub device: DeviceSettings,
    pub backend: BackendSettings,
    pub persist: PersistSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSettings {
    /// Device address; `None` until configured.
    #[serde(default)]
    pub ip: Option<String>,
    pub port: u16,
    #[serde(deserialize_with = "serde_duration::deserialize")]
    pub measuring_window: Duration,
    #[serde(deserialize_with = "serde_duration::deserialize")]
    pub select_delay: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(deserialize_with = "serde_duration::deserialize")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistSettings {
    pub max_retries: u32,
    #[serde(deserialize_with = "serde_duration::deserialize")]
    pub initial_backoff: Duration,
    #[serde(deserialize_with = "serde_duration::deserialize")]
    pub max_backoff: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

impl Settings {
    /// Load settings, reading `path` if given and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, environment())
    }

    fn load_from(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("device.port", 81)?
            .set_default("device.measuring_window", "30s")?
            .set_default("device.select_delay", "2s")?
            .set_default("backend.base_url", "http://localhost:5000")?
            .set_default("backend.timeout", "10s")?
            .set_default("persist.max_retries", 3)?
            .set_default("persist.initial_backoff", "500ms")?
            .set_default("persist.max_backoff", "10s")?
            .set_default("storage.data_dir", ".bodywatch")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(env)
            .build()
            .context("reading configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.persist.max_retries)
            .initial_backoff(self.persist.initial_backoff)
            .max_backoff(self.persist.max_backoff)
            .build()
    }

    pub fn measuring_window(&self) -> MeasuringWindow {
        MeasuringWindow::new(self.device.measuring_window, self.device.select_delay)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Environment {
        environment().source(Some(Default::default()))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from(None, no_env()).unwrap();
        assert_eq!(settings.device.ip, None);
        assert_eq!(settings.device.port, 81);
        assert_eq!(settings.device.measuring_window, Duration::from_secs(30));
        assert_eq!(settings.device.select_delay, Duration::from_secs(2));
        assert_eq!(settings.backend.base_url, "http://localhost:5000");
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert_eq!(settings.storage.data_dir, PathBuf::from(".bodywatch"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[device]
ip = "192.168.0.140"
measuring_window = "45s"

[persist]
max_retries = 5
"#
        )
        .unwrap();

        let settings = Settings::load_from(Some(file.path()), no_env()).unwrap();
        assert_eq!(settings.device.ip.as_deref(), Some("192.168.0.140"));
        assert_eq!(settings.device.measuring_window, Duration::from_secs(45));
        assert_eq!(settings.device.port, 81);
        assert_eq!(settings.persist.max_retries, 5);
    }

    #[test]
    fn test_environment_overrides_file() {
        let vars = [
            ("BODYWATCH_DEVICE__IP".to_string(), "10.0.0.7".to_string()),
            ("BODYWATCH_BACKEND__TIMEOUT".to_string(), "3s".to_string()),
        ];
        let env = environment().source(Some(vars.into_iter().collect()));

        let settings = Settings::load_from(None, env).unwrap();
        assert_eq!(settings.device.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(settings.backend.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_bad_duration_is_an_error() {
        let vars = [("BODYWATCH_DEVICE__SELECT_DELAY".to_string(), "soon".to_string())];
        let env = environment().source(Some(vars.into_iter().collect()));
        assert!(Settings::load_from(None, env).is_err());
    }
}
