use crate::error::{TelemetryError, TelemetryResult};
use crate::kinematics::VelocitySample;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Header row of the session log, in field order.
pub const LOG_HEADER: [&str; 4] = ["datetime", "yaw", "angular_velocity", "linear_velocity"];

/// One row of the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub datetime: DateTime<Local>,
    pub yaw: f64,
    pub angular_velocity: f64,
    pub linear_velocity: f64,
}

impl From<&VelocitySample> for LogRecord {
    fn from(sample: &VelocitySample) -> Self {
        Self {
            datetime: sample.recorded_at,
            yaw: sample.yaw_degrees,
            angular_velocity: sample.angular_velocity,
            linear_velocity: sample.linear_velocity,
        }
    }
}

/// Append-only CSV log owned by the sampler for the whole session.
///
/// The header is written and flushed on creation. Rows are buffered until
/// [`DurableLog::flush`], which also syncs the file to storage. Dropping the
/// log without [`DurableLog::close`] still flushes whatever is buffered.
pub struct DurableLog {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows_written: u64,
    flushes: u64,
}

impl DurableLog {
    pub fn create(path: &Path) -> TelemetryResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path).map_err(|e| {
            TelemetryError::Persistence(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(LOG_HEADER)?;

        let mut log = Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            rows_written: 0,
            flushes: 0,
        };
        log.flush()?;
        Ok(log)
    }

    fn writer(&mut self) -> TelemetryResult<&mut csv::Writer<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| TelemetryError::Persistence("log already closed".to_string()))
    }

    pub fn append(&mut self, record: &LogRecord) -> TelemetryResult<()> {
        self.writer()?.serialize(record)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Push buffered rows to the file and sync them to stable storage.
    pub fn flush(&mut self) -> TelemetryResult<()> {
        let writer = self.writer()?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        self.flushes += 1;
        Ok(())
    }

    /// Final flush and sync. Returns the total number of flushes performed.
    pub fn close(mut self) -> TelemetryResult<u64> {
        self.flush()?;
        if let Some(writer) = self.writer.take() {
            let file = writer
                .into_inner()
                .map_err(|e| TelemetryError::Persistence(e.to_string()))?;
            file.sync_all()?;
        }
        log::info!(
            "Closed {} ({} rows, {} flushes)",
            self.path.display(),
            self.rows_written,
            self.flushes
        );
        Ok(self.flushes)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DurableLog {
    fn drop(&mut self) {
        if self.writer.is_some() {
            match self.flush() {
                Ok(()) => log::warn!(
                    "Log {} dropped without close, flushed {} rows",
                    self.path.display(),
                    self.rows_written
                ),
                Err(e) => log::error!("Final flush of {} failed: {}", self.path.display(), e),
            }
        }
    }
}

/// Read a session log back in row order.
pub fn read_log(path: &Path) -> TelemetryResult<Vec<LogRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.iter().ne(LOG_HEADER.iter().copied()) {
        return Err(TelemetryError::Persistence(format!(
            "unexpected log header {:?}",
            headers
        )));
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<LogRecord>() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn record(i: u32) -> LogRecord {
        LogRecord {
            datetime: Local::now() + ChronoDuration::milliseconds(i as i64 * 5_000),
            yaw: 10.0 + i as f64 * 0.125,
            angular_velocity: 0.384_615_384_615_384_6 * i as f64,
            linear_velocity: 2_610_052.692_307_692 * i as f64,
        }
    }

    #[test]
    fn test_header_written_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let log = DurableLog::create(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "datetime,yaw,angular_velocity,linear_velocity\n");
        log.close().unwrap();
    }

    #[test]
    fn test_round_trip_preserves_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session/data.csv");
        let mut log = DurableLog::create(&path).unwrap();

        let written: Vec<LogRecord> = (0..5).map(record).collect();
        for r in &written {
            log.append(r).unwrap();
        }
        assert_eq!(log.rows_written(), 5);
        log.close().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1 + 5);
        assert_eq!(read_log(&path).unwrap(), written);
    }

    #[test]
    fn test_flush_makes_rows_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut log = DurableLog::create(&path).unwrap();

        log.append(&record(1)).unwrap();
        log.flush().unwrap();
        assert_eq!(read_log(&path).unwrap().len(), 1);
        assert_eq!(log.flushes(), 2);
        log.close().unwrap();
    }

    #[test]
    fn test_drop_without_close_leaves_complete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        {
            let mut log = DurableLog::create(&path).unwrap();
            for i in 0..3 {
                log.append(&record(i)).unwrap();
            }
        }

        let rows = read_log(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[test]
    fn test_rejects_foreign_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        fs::write(&path, "timestamp,value\n1,2\n").unwrap();
        assert!(matches!(read_log(&path), Err(TelemetryError::Persistence(_))));
    }

    #[test]
    fn test_create_in_missing_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // A regular file cannot be used as a directory
        let result = DurableLog::create(&blocker.join("data.csv"));
        assert!(matches!(result, Err(TelemetryError::Persistence(_))));
    }
}
