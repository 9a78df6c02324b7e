//! File-backed stores.
//!
//! Each key lives in its own JSON file under the data directory. Reads are
//! tolerant: a missing file is "no value" and a corrupt file is logged and
//! treated the same way.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bodywatch_types::{ActivityRecord, AthleteProfile, FinalMeasurement, SessionUser};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::HistoryStore;

/// One JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonFile<T> {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _marker: PhantomData,
        }
    }

    /// Returns the path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file.
    pub fn read(&self) -> Option<T> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "read error");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unparseable file");
                None
            }
        }
    }

    /// Write the value, replacing the file atomically.
    pub fn write(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// Delete the file. Deleting a missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

/// The body measurement history cache.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    file: JsonFile<Vec<FinalMeasurement>>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Result<Vec<FinalMeasurement>> {
        Ok(self.file.read().unwrap_or_default())
    }

    fn save(&mut self, records: &[FinalMeasurement]) -> Result<()> {
        self.file.write(&records.to_vec())
    }

    fn clear(&mut self) -> Result<()> {
        self.file.remove()
    }
}

/// Keyed local state under one data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file<T: Serialize + DeserializeOwned>(&self, key: &str) -> JsonFile<T> {
        JsonFile::new(self.dir.join(format!("{}.json", key)))
    }

    /// The body measurement history cache.
    pub fn history(&self) -> JsonFileStore {
        JsonFileStore::new(self.dir.join("body_measurements.json"))
    }

    /// Completed activity tests, oldest first.
    pub fn activities(&self) -> Vec<ActivityRecord> {
        self.file("activity_measurements").read().unwrap_or_default()
    }

    /// Append one activity result.
    pub fn push_activity(&self, record: ActivityRecord) -> Result<()> {
        let mut records = self.activities();
        records.push(record);
        self.file("activity_measurements").write(&records)
    }

    pub fn profile(&self) -> Option<AthleteProfile> {
        self.file("athlete_profile").read()
    }

    pub fn save_profile(&self, profile: &AthleteProfile) -> Result<()> {
        self.file("athlete_profile").write(profile)
    }

    /// The logged-in user, if any.
    pub fn session(&self) -> Option<SessionUser> {
        self.file("session").read()
    }

    pub fn save_session(&self, user: &SessionUser) -> Result<()> {
        self.file("session").write(user)
    }

    /// Log out: forget the session user and the athlete profile.
    pub fn clear_session(&self) -> Result<()> {
        self.file::<SessionUser>("session").remove()?;
        self.file::<AthleteProfile>("athlete_profile").remove()
    }

    /// The last device URL used.
    pub fn device_url(&self) -> Option<String> {
        self.file("device").read()
    }

    pub fn save_device_url(&self, url: &str) -> Result<()> {
        self.file("device").write(&url.to_string())
    }

    /// This installation's client id, generated on first use.
    pub fn client_id(&self) -> Result<String> {
        let file = self.file::<String>("client_id");
        if let Some(id) = file.read() {
            return Ok(id);
        }
        let id = format!("webapp_{}", rand::thread_rng().gen_range(0..100_000));
        file.write(&id)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodywatch_types::{CaptureTime, Channel, MeasurementFields, ProfileStamp, RecordId};
    use tempfile::TempDir;

    fn record(id: u64) -> FinalMeasurement {
        FinalMeasurement {
            id: RecordId(id),
            fields: MeasurementFields::single(Channel::KneeHeight, 48.0),
            captured: CaptureTime::default(),
            profile: ProfileStamp::default(),
        }
    }

    #[test]
    fn test_history_store_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::new(dir.path()).history();

        assert!(store.load().unwrap().is_empty());

        store.save(&[record(2), record(1)]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, RecordId(2));
        assert_eq!(loaded[0].fields.get(Channel::KneeHeight), Some(48.0));

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_empty());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        fs::write(dir.path().join("body_measurements.json"), "not valid json").unwrap();
        fs::write(dir.path().join("athlete_profile.json"), "undefined").unwrap();

        assert!(store.history().load().unwrap().is_empty());
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_client_id_is_stable() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let first = store.client_id().unwrap();
        assert!(first.starts_with("webapp_"));
        assert_eq!(store.client_id().unwrap(), first);
    }

    #[test]
    fn test_session_and_profile() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("nested"));

        let profile = AthleteProfile::new("Ada", 31, 64.5);
        store.save_profile(&profile).unwrap();
        store
            .save_session(&SessionUser {
                id: 3,
                email: Some("ada@example.com".to_string()),
                name: None,
                age: None,
                weight: None,
            })
            .unwrap();

        assert_eq!(store.profile(), Some(profile));
        assert_eq!(store.session().map(|u| u.id), Some(3));

        store.clear_session().unwrap();
        assert!(store.session().is_none());
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_device_url_persisted() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(store.device_url().is_none());
        store.save_device_url("ws://192.168.0.140:81/").unwrap();
        assert_eq!(store.device_url().as_deref(), Some("ws://192.168.0.140:81/"));
    }
}
