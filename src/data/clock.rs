//! Capture stamps and record ids.

use bodywatch_types::{CaptureTime, RecordId};
use chrono::{DateTime, Local, TimeZone};

/// Stamp the current local time.
pub fn capture_now() -> CaptureTime {
    capture_at(Local::now())
}

/// Stamp a specific instant.
pub fn capture_at<Tz: TimeZone>(at: DateTime<Tz>) -> CaptureTime
where
    Tz::Offset: std::fmt::Display,
{
    CaptureTime {
        date: at.format("%Y-%m-%d").to_string(),
        time: at.format("%H:%M:%S").to_string(),
        timestamp_ms: at.timestamp_millis().max(0) as u64,
    }
}

/// Hands out millisecond ids that never repeat.
///
/// Ids follow the capture timestamp; two records finalized within the same
/// millisecond get consecutive values instead of colliding.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after the largest id already in use.
    pub fn resume_after(last: Option<RecordId>) -> Self {
        Self {
            last: last.map(|id| id.0).unwrap_or(0),
        }
    }

    pub fn next(&mut self, timestamp_ms: u64) -> RecordId {
        self.last = timestamp_ms.max(self.last + 1);
        RecordId(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_capture_at_formats() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        let stamp = capture_at(at);
        assert_eq!(stamp.date, "2024-03-09");
        assert_eq!(stamp.time, "07:05:02");
        assert_eq!(stamp.timestamp_ms, 1_709_967_902_000);
    }

    #[test]
    fn test_ids_are_strictly_increasing() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next(1000), RecordId(1000));
        assert_eq!(ids.next(1000), RecordId(1001));
        assert_eq!(ids.next(999), RecordId(1002));
        assert_eq!(ids.next(5000), RecordId(5000));
    }

    #[test]
    fn test_resume_after_existing() {
        let mut ids = IdAllocator::resume_after(Some(RecordId(7000)));
        assert_eq!(ids.next(6000), RecordId(7001));
    }
}
