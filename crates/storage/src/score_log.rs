//! Append-only drowsiness score log

use crate::{DrowsinessRecord, StorageError};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// CSV log of detection results.
///
/// Every append runs inside one writer lock covering the header check,
/// the header row and the data row, so concurrent first writers cannot
/// both emit a header and rows are never interleaved.
pub struct ScoreLog {
    path: PathBuf,
    writer_lock: Mutex<()>,
}

impl ScoreLog {
    /// Create a log handle. The file itself is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Score log at {}", path.display());
        Self {
            path,
            writer_lock: Mutex::new(()),
        }
    }

    /// Log location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a verdict stamped with the current local time
    pub fn append(&self, is_drowsy: bool, score: f32) -> Result<DrowsinessRecord, StorageError> {
        let record = DrowsinessRecord::now(is_drowsy, score);
        self.append_record(&record)?;
        Ok(record)
    }

    /// Append a pre-stamped record
    pub fn append_record(&self, record: &DrowsinessRecord) -> Result<(), StorageError> {
        let _guard = self
            .writer_lock
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;

        // A zero-length file has no header yet, whether we just created it
        // or an operator truncated it between runs.
        let needs_header = file
            .metadata()
            .map_err(|e| StorageError::io(&self.path, e))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(record)
            .map_err(|e| StorageError::csv(&self.path, e))?;
        writer
            .flush()
            .map_err(|e| StorageError::io(&self.path, e))?;

        if needs_header {
            info!("Created score log {}", self.path.display());
        }
        debug!(
            "Logged score {} (drowsy: {}) at {}",
            record.score, record.is_drowsy, record.timestamp
        );
        Ok(())
    }

    /// Read back every record in the log
    pub fn records(&self) -> Result<Vec<DrowsinessRecord>, StorageError> {
        let _guard = self
            .writer_lock
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        read_records(&self.path)
    }
}

/// Parse a score log written by [`ScoreLog`].
///
/// Fails on a missing file, a missing column, an unparsable timestamp or
/// a malformed score or verdict.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<DrowsinessRecord>, StorageError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| StorageError::csv(path, e))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row.map_err(|e| StorageError::csv(path, e))?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir) -> ScoreLog {
        ScoreLog::new(dir.path().join("drowsiness_log.csv"))
    }

    fn line_count(path: &Path) -> usize {
        std::fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_first_append_writes_header() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        let record = log.append(true, 0.87).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,score,is_drowsy");
        assert_eq!(
            lines[1],
            format!("{},0.87,True", record.timestamp.format(crate::TIMESTAMP_FORMAT))
        );
    }

    #[test]
    fn test_second_append_does_not_repeat_header() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir);

        log.append(true, 0.9).unwrap();
        log.append(false, 0.1).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.matches("timestamp,score,is_drowsy").count(), 1);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_existing_log_accumulates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drowsiness_log.csv");
        std::fs::write(&path, "timestamp,score,is_drowsy\n2024-05-01 13:45:09,0.5,False\n").unwrap();

        // A fresh handle, as after a server restart
        let log = ScoreLog::new(&path);
        log.append(true, 0.75).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 0.5);
        assert!(records[1].is_drowsy);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drowsiness_log.csv");
        std::fs::write(&path, "").unwrap();

        ScoreLog::new(&path).append(false, 0.2).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let log = ScoreLog::new(dir.path().join("missing").join("log.csv"));
        assert!(matches!(log.append(true, 0.5), Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_read_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_records(dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn test_read_rejects_non_finite_score() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drowsiness_log.csv");
        std::fs::write(&path, "timestamp,score,is_drowsy\n2024-05-01 13:45:09,NaN,False\n").unwrap();

        assert!(matches!(read_records(&path), Err(StorageError::Csv { .. })));
    }

    #[test]
    fn test_concurrent_appends() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(log_in(&dir));
        let writers = 16;
        let per_writer = 25;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..per_writer {
                        log.append(i % 2 == 0, w as f32 + i as f32 / 100.0).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = writers * per_writer;
        assert_eq!(line_count(log.path()), total + 1);
        assert_eq!(log.records().unwrap().len(), total);
    }

    proptest! {
        #[test]
        fn test_appended_records_round_trip(
            entries in prop::collection::vec((any::<bool>(), -1.0e6f32..1.0e6f32), 1..20),
            secs in 0i64..4_000_000_000,
        ) {
            let dir = TempDir::new().unwrap();
            let log = log_in(&dir);
            let timestamp = DateTime::from_timestamp(secs, 0).unwrap().naive_utc();

            let written: Vec<_> = entries
                .iter()
                .map(|&(is_drowsy, score)| DrowsinessRecord { timestamp, score, is_drowsy })
                .collect();
            for record in &written {
                log.append_record(record).unwrap();
            }

            prop_assert_eq!(read_records(log.path()).unwrap(), written);
        }
    }
}
