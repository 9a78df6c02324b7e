//! Reconciles the device frame stream into live and finalized records.

use anyhow::{Context, Result};
use bodywatch_types::{
    AthleteProfile, CaptureTime, Channel, FinalMeasurement, LiveMeasurement, MeasurementFields,
    MeasurementRecord, ProfileStamp, RecordId, SaveMeasurement, StoredMeasurement,
};
use tracing::{debug, info, warn};

use super::clock::{capture_now, IdAllocator};
use super::history::History;
use crate::persist::PersistSink;
use crate::source::{parse_frame, DeviceMessage};
use crate::store::HistoryStore;

/// User id attached to saves when nobody is logged in.
pub const DEFAULT_USER_ID: u64 = 1;

/// What a single input did to the record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Dropped without touching any state.
    Ignored,
    /// The live record was created or replaced.
    LiveUpdated,
    /// A record was finalized and submitted for persistence.
    Finalized(RecordId),
}

/// Owns the live slot and the finalized history.
///
/// There is at most one live record. Every finalization prepends a new
/// immutable record, writes the history cache and submits exactly one save.
#[derive(Debug)]
pub struct Reconciler {
    live: Option<LiveMeasurement>,
    history: History,
    profile: AthleteProfile,
    user_id: u64,
    ids: IdAllocator,
    sink: Box<dyn PersistSink>,
    store: Box<dyn HistoryStore>,
}

impl Reconciler {
    /// Create a reconciler with empty history.
    pub fn new(sink: Box<dyn PersistSink>, store: Box<dyn HistoryStore>) -> Self {
        Self {
            live: None,
            history: History::new(),
            profile: AthleteProfile::default(),
            user_id: DEFAULT_USER_ID,
            ids: IdAllocator::new(),
            sink,
            store,
        }
    }

    /// Create a reconciler seeded from the history store.
    pub fn restore(sink: Box<dyn PersistSink>, store: Box<dyn HistoryStore>) -> Result<Self> {
        let records = store.load().context("loading measurement history")?;
        let mut reconciler = Self::new(sink, store);
        reconciler.seed(records);
        Ok(reconciler)
    }

    pub fn with_profile(mut self, profile: AthleteProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_user(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }

    /// Change the profile stamped onto records from now on.
    pub fn set_profile(&mut self, profile: AthleteProfile) {
        self.profile = profile;
    }

    pub fn profile(&self) -> &AthleteProfile {
        &self.profile
    }

    pub fn set_user(&mut self, user_id: u64) {
        self.user_id = user_id;
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Decode and apply one raw device frame.
    pub fn handle_frame(&mut self, text: &str) -> Reconciled {
        match parse_frame(text) {
            Some(message) => self.apply(message),
            None => {
                warn!(frame = %truncate(text, 80), "dropping unrecognized frame");
                Reconciled::Ignored
            }
        }
    }

    /// Apply a decoded message, stamped with the current time.
    pub fn apply(&mut self, message: DeviceMessage) -> Reconciled {
        self.apply_at(message, capture_now())
    }

    /// Apply a decoded message with an explicit capture time.
    pub fn apply_at(&mut self, message: DeviceMessage, captured: CaptureTime) -> Reconciled {
        match message {
            DeviceMessage::Live(fields) => {
                debug!(readings = fields.len(), "live update");
                self.live = Some(LiveMeasurement {
                    fields,
                    captured,
                    profile: self.stamp(),
                });
                Reconciled::LiveUpdated
            }
            DeviceMessage::Done(fields) => {
                self.live = None;
                Reconciled::Finalized(self.finalize(fields, captured))
            }
        }
    }

    /// Record a single value typed in by the operator.
    ///
    /// Behaves like a `done` frame carrying only that field, except that the
    /// live record is left alone.
    pub fn manual_entry(&mut self, channel: Channel, value: f64) -> RecordId {
        info!(%channel, value, "manual entry");
        self.finalize(MeasurementFields::single(channel, value), capture_now())
    }

    /// Record the ankle height, which the rig cannot measure.
    pub fn manual_ankle_height(&mut self, value: f64) -> RecordId {
        self.manual_entry(Channel::AnkleHeight, value)
    }

    /// Drop every record and clear the durable cache.
    pub fn clear_history(&mut self) -> Result<()> {
        self.live = None;
        self.history.clear();
        self.store.clear().context("clearing measurement history")?;
        info!("measurement history cleared");
        Ok(())
    }

    /// Replace history with records fetched from the backend.
    pub fn replace_history(&mut self, rows: &[StoredMeasurement]) {
        let records = rows.iter().map(|row| self.from_stored(row)).collect::<Vec<_>>();
        self.seed(records);
        self.write_cache();
    }

    pub fn live(&self) -> Option<&LiveMeasurement> {
        self.live.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Every record: the live one first, then history newest first.
    pub fn records(&self) -> Vec<MeasurementRecord> {
        self.live
            .iter()
            .cloned()
            .map(MeasurementRecord::Live)
            .chain(self.history.iter().cloned().map(MeasurementRecord::Final))
            .collect()
    }

    fn seed(&mut self, records: Vec<FinalMeasurement>) {
        self.history = History::from_records(records);
        self.ids = IdAllocator::resume_after(self.history.max_id());
    }

    fn stamp(&self) -> ProfileStamp {
        ProfileStamp::from_profile(&self.profile)
    }

    fn finalize(&mut self, fields: MeasurementFields, captured: CaptureTime) -> RecordId {
        let id = self.ids.next(captured.timestamp_ms);
        let record = FinalMeasurement {
            id,
            fields,
            captured,
            profile: self.stamp(),
        };
        info!(%id, readings = record.fields.len(), "measurement finalized");

        self.sink.submit(SaveMeasurement::from_record(self.user_id, &record));
        self.history.record(record);
        self.write_cache();
        id
    }

    fn write_cache(&mut self) {
        if let Err(e) = self.store.save(&self.history.to_vec()) {
            warn!(error = %e, "failed to write measurement cache");
        }
    }

    fn from_stored(&mut self, row: &StoredMeasurement) -> FinalMeasurement {
        let date = row.date.clone().unwrap_or_default();
        let id = match row.id {
            Some(id) => RecordId(id),
            None => self.ids.next(0),
        };
        FinalMeasurement {
            id,
            fields: row.fields(),
            captured: CaptureTime {
                // Backend dates may carry a time part.
                date: date.chars().take(10).collect(),
                time: String::new(),
                timestamp_ms: 0,
            },
            profile: row.profile_stamp(&self.profile),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::RecordingSink;
    use crate::store::MemoryStore;

    fn reconciler() -> (Reconciler, RecordingSink, MemoryStore) {
        let sink = RecordingSink::new();
        let store = MemoryStore::new();
        let reconciler = Reconciler::new(Box::new(sink.clone()), Box::new(store.clone()));
        (reconciler, sink, store)
    }

    fn live(data: &str) -> String {
        format!(r#"{{"type":"live_measurement","data":{}}}"#, data)
    }

    fn done(data: &str) -> String {
        format!(r#"{{"type":"done","data":{}}}"#, data)
    }

    #[test]
    fn test_live_updates_keep_single_record() {
        let (mut r, sink, _) = reconciler();

        assert_eq!(r.handle_frame(&live(r#"{"1":100.0}"#)), Reconciled::LiveUpdated);
        assert_eq!(r.handle_frame(&live(r#"{"2":140.0}"#)), Reconciled::LiveUpdated);
        assert_eq!(r.handle_frame(&live(r#"{"1":101.0,"3":60.0}"#)), Reconciled::LiveUpdated);

        let records = r.records();
        assert_eq!(records.iter().filter(|rec| rec.is_live()).count(), 1);
        assert!(r.history().is_empty());
        assert!(sink.is_empty());

        // Replaced, not merged
        let fields = &r.live().unwrap().fields;
        assert_eq!(fields.get(Channel::CrownHeight), Some(101.0));
        assert_eq!(fields.get(Channel::ElbowReach), Some(60.0));
        assert_eq!(fields.get(Channel::ShoulderHeight), None);
    }

    #[test]
    fn test_done_finalizes_and_persists_once() {
        let (mut r, sink, store) = reconciler();
        r.handle_frame(&live(r#"{"1":119.0}"#));

        let outcome = r.handle_frame(&done(r#"{"1":120.5,"4":90.0}"#));
        let Reconciled::Finalized(id) = outcome else {
            panic!("expected finalization, got {:?}", outcome);
        };

        assert!(r.live().is_none());
        assert_eq!(r.history().len(), 1);
        let record = r.history().latest().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.fields.get(Channel::CrownHeight), Some(120.5));
        assert_eq!(record.fields.get(Channel::HipHeight), Some(90.0));

        let saves = sink.submitted();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].user_id, DEFAULT_USER_ID);
        assert_eq!(saves[0].crown_height, 120.5);
        assert_eq!(saves[0].hip_height, 90.0);
        assert_eq!(saves[0].shoulder_height, 0.0);
        assert_eq!(saves[0].ankle_height, 0.0);

        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_manual_ankle_height() {
        let (mut r, sink, _) = reconciler();
        r.handle_frame(&live(r#"{"6":48.0}"#));

        let id = r.manual_ankle_height(18.5);

        let record = r.history().get(id).unwrap();
        assert_eq!(record.fields.get(Channel::AnkleHeight), Some(18.5));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.submitted()[0].ankle_height, 18.5);
        // The live phase is untouched
        assert!(r.live().is_some());
    }

    #[test]
    fn test_malformed_frames_are_ignored() {
        let (mut r, sink, store) = reconciler();
        r.handle_frame(&live(r#"{"1":100.0}"#));
        let before = r.records();

        for frame in ["not json", r#"{"type":"status"}"#, r#"{"data":{"1":1}}"#, "", "[1,2]"] {
            assert_eq!(r.handle_frame(frame), Reconciled::Ignored);
        }

        assert_eq!(r.records(), before);
        assert!(sink.is_empty());
        assert!(store.is_cleared());
    }

    #[test]
    fn test_clear_empties_history_and_cache() {
        let (mut r, _, store) = reconciler();
        for value in [1.0, 2.0, 3.0] {
            r.handle_frame(&done(&format!(r#"{{"2":{}}}"#, value)));
        }
        r.handle_frame(&live(r#"{"1":5.0}"#));
        assert_eq!(store.records().len(), 3);

        r.clear_history().unwrap();

        assert!(r.records().is_empty());
        assert!(store.is_cleared());

        let reloaded =
            Reconciler::restore(Box::new(RecordingSink::new()), Box::new(store.clone())).unwrap();
        assert!(reloaded.history().is_empty());
    }

    #[test]
    fn test_duplicate_done_is_not_deduplicated() {
        let (mut r, sink, _) = reconciler();
        let frame = done(r#"{"1":120.5}"#);

        let first = r.handle_frame(&frame);
        let second = r.handle_frame(&frame);

        assert_ne!(first, second);
        assert_eq!(r.history().len(), 2);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_records_order_live_then_newest() {
        let (mut r, _, _) = reconciler();
        let a = r.apply_at(
            DeviceMessage::Done(MeasurementFields::single(Channel::KneeHeight, 1.0)),
            CaptureTime { timestamp_ms: 10, ..Default::default() },
        );
        let b = r.apply_at(
            DeviceMessage::Done(MeasurementFields::single(Channel::KneeHeight, 2.0)),
            CaptureTime { timestamp_ms: 10, ..Default::default() },
        );
        r.handle_frame(&live(r#"{"1":5.0}"#));

        let records = r.records();
        assert_eq!(records.len(), 3);
        assert!(records[0].is_live());
        assert_eq!(Reconciled::Finalized(records[1].id().unwrap()), b);
        assert_eq!(Reconciled::Finalized(records[2].id().unwrap()), a);
        // Same millisecond still yields distinct ids
        assert_eq!(records[1].id(), Some(RecordId(11)));
    }

    #[test]
    fn test_profile_stamp_and_user() {
        let (r, sink, _) = reconciler();
        let mut r = r.with_user(42).with_profile(AthleteProfile::new("Ada", 31, 64.5));

        r.handle_frame(&done(r#"{"3":55.0}"#));
        let record = r.history().latest().unwrap();
        assert_eq!(record.profile.name, "Ada");
        assert_eq!(record.profile.age, "31");

        let save = &sink.submitted()[0];
        assert_eq!(save.user_id, 42);
        assert_eq!(save.name, "Ada");
        assert_eq!(save.elbow_reach, 55.0);
    }

    #[test]
    fn test_restore_resumes_ids() {
        let store = MemoryStore::new();
        {
            let mut r = Reconciler::new(Box::new(RecordingSink::new()), Box::new(store.clone()));
            r.apply_at(
                DeviceMessage::Done(MeasurementFields::single(Channel::HipHeight, 90.0)),
                CaptureTime { timestamp_ms: 5_000, ..Default::default() },
            );
        }

        let mut r = Reconciler::restore(Box::new(RecordingSink::new()), Box::new(store)).unwrap();
        assert_eq!(r.history().len(), 1);
        let next = r.apply_at(
            DeviceMessage::Done(MeasurementFields::new()),
            CaptureTime { timestamp_ms: 1_000, ..Default::default() },
        );
        assert_eq!(next, Reconciled::Finalized(RecordId(5_001)));
    }

    #[test]
    fn test_replace_history_from_backend() {
        let (mut r, sink, store) = reconciler();
        let rows = vec![StoredMeasurement {
            id: Some(7),
            user_id: Some(1),
            date: Some("2024-03-09T00:00:00.000Z".to_string()),
            knee_height: Some(48.0),
            ..Default::default()
        }];

        r.replace_history(&rows);

        let record = r.history().latest().unwrap();
        assert_eq!(record.id, RecordId(7));
        assert_eq!(record.captured.date, "2024-03-09");
        assert_eq!(record.fields.get(Channel::KneeHeight), Some(48.0));
        assert_eq!(store.records().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_backend_rows_keep_their_saved_profile() {
        let (mut r, _sink, _store) = reconciler();
        r.set_profile(AthleteProfile::new("Grace", 45, 80.0));
        let rows = vec![
            StoredMeasurement {
                id: Some(8),
                name: Some("Ada".to_string()),
                age: Some(31),
                weight: Some(64.5),
                ..Default::default()
            },
            StoredMeasurement {
                id: Some(9),
                ..Default::default()
            },
        ];

        r.replace_history(&rows);

        let saved = r.history().get(RecordId(8)).unwrap();
        assert_eq!(saved.profile.name, "Ada");
        assert_eq!(saved.profile.age, "31");
        assert_eq!(saved.profile.weight, "64.5");
        // Rows without profile columns fall back to the current profile
        let bare = r.history().get(RecordId(9)).unwrap();
        assert_eq!(bare.profile.name, "Grace");
        assert_eq!(bare.profile.age, "45");
    }
}
