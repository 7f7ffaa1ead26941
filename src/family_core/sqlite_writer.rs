//! SQLite catalog export for families
//!
//! One row per detection, keyed by detection id. An attached event is stored
//! as JSON. The export is one-way: it keeps enough to query detections but is
//! never read back into a family.

use super::codec::format_time;
use super::detection::Detection;
use super::family::Family;
use super::writer_backend::{FamilyWriterBackend, FamilyWriterError};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone)]
struct DetectionRow {
    detection_id: String,
    template_name: String,
    detect_time: String,
    timestamp: i64,
    no_chans: u32,
    detect_val: f64,
    threshold: f64,
    threshold_type: String,
    threshold_input: f64,
    typeofdet: String,
    chans: Option<String>,
    event_id: Option<String>,
    event_json: Option<String>,
}

impl DetectionRow {
    fn from_detection(detection: &Detection) -> Result<Self, FamilyWriterError> {
        let chans = detection
            .channels
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let event_json = detection.event().map(serde_json::to_string).transpose()?;
        Ok(Self {
            detection_id: detection.id().to_string(),
            template_name: detection.template_name().to_string(),
            detect_time: format_time(&detection.trigger_time),
            timestamp: detection.trigger_time.timestamp(),
            no_chans: detection.channel_count,
            detect_val: detection.detection_value,
            threshold: detection.threshold,
            threshold_type: detection.threshold_kind.as_str().to_string(),
            threshold_input: detection.threshold_input,
            typeofdet: detection.detection_kind.as_str().to_string(),
            chans,
            event_id: detection.event().map(|e| e.resource_id.clone()),
            event_json,
        })
    }
}

pub struct SqliteFamilyWriter {
    conn: Connection,
    batch: Vec<DetectionRow>,
    batch_size: usize,
    last_flush: Instant,
    flush_interval_secs: u64,
}

impl SqliteFamilyWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, FamilyWriterError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS detections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                detection_id TEXT UNIQUE NOT NULL,
                template_name TEXT NOT NULL,
                detect_time TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                no_chans INTEGER NOT NULL,
                detect_val REAL NOT NULL,
                threshold REAL NOT NULL,
                threshold_type TEXT NOT NULL,
                threshold_input REAL NOT NULL,
                typeofdet TEXT NOT NULL,
                chans TEXT,
                event_id TEXT,
                event_json TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_template_timestamp ON detections(template_name, timestamp)",
            [],
        )?;

        log::info!("✅ SQLite detection export initialized (journal_mode={})", mode);

        Ok(Self {
            conn,
            batch: Vec::with_capacity(500),
            batch_size: 500,
            last_flush: Instant::now(),
            flush_interval_secs: 2,
        })
    }

    fn flush_batch(&mut self) -> Result<(), FamilyWriterError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for row in &self.batch {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO detections
                 (detection_id, template_name, detect_time, timestamp, no_chans, detect_val,
                  threshold, threshold_type, threshold_input, typeofdet, chans, event_id, event_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    row.detection_id,
                    row.template_name,
                    row.detect_time,
                    row.timestamp,
                    row.no_chans,
                    row.detect_val,
                    row.threshold,
                    row.threshold_type,
                    row.threshold_input,
                    row.typeofdet,
                    row.chans,
                    row.event_id,
                    row.event_json,
                ],
            )?;
        }
        tx.commit()?;

        log::debug!(
            "✅ Flushed {} detections to SQLite ({} new)",
            self.batch.len(),
            inserted
        );
        self.batch.clear();
        self.last_flush = Instant::now();
        Ok(())
    }
}

#[async_trait]
impl FamilyWriterBackend for SqliteFamilyWriter {
    async fn write_family(&mut self, family: &Family) -> Result<(), FamilyWriterError> {
        for detection in family.detections() {
            self.batch.push(DetectionRow::from_detection(detection)?);
        }

        // Auto-flush if batch full or time elapsed
        if self.batch.len() >= self.batch_size
            || self.last_flush.elapsed().as_secs() >= self.flush_interval_secs
        {
            self.flush_batch()?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), FamilyWriterError> {
        self.flush_batch()
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

impl Drop for SqliteFamilyWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush_batch() {
            log::warn!("Failed to flush detections on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family_core::detection::{DetectionKind, ThresholdKind};
    use crate::family_core::event::DerivedEvent;
    use crate::family_core::template::Template;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn create_test_family(name: &str) -> Family {
        let detections = vec![
            Detection::new(
                name,
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                8,
                12.25,
                9.0,
                ThresholdKind::Mad,
                8.0,
                DetectionKind::Corr,
            )
            .with_channels(vec![("FOZ".to_string(), "HHZ".to_string())]),
            Detection::new(
                name,
                Utc.timestamp_opt(1_700_000_060, 0).unwrap(),
                7,
                10.5,
                9.0,
                ThresholdKind::Mad,
                8.0,
                DetectionKind::Corr,
            ),
        ];
        Family::new(Arc::new(Template::new(name)), detections)
    }

    #[tokio::test]
    async fn test_sqlite_export_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("data/families.db");
        let mut writer = SqliteFamilyWriter::new(&db_path).unwrap();

        writer.write_family(&create_test_family("a")).await.unwrap();
        writer.flush().await.unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let (count, max_val): (i64, f64) = conn
            .query_row(
                "SELECT COUNT(*), MAX(detect_val) FROM detections WHERE template_name = ?1",
                params!["a"],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(max_val, 12.25);

        let chans: String = conn
            .query_row(
                "SELECT chans FROM detections WHERE no_chans = 8",
                [],
                |row| row.get(0),
            )
            .unwrap();
        let parsed: Vec<(String, String)> = serde_json::from_str(&chans).unwrap();
        assert_eq!(parsed, vec![("FOZ".to_string(), "HHZ".to_string())]);
    }

    #[tokio::test]
    async fn test_sqlite_export_stores_event_json() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("families.db");
        let mut writer = SqliteFamilyWriter::new(&db_path).unwrap();

        let mut family = create_test_family("a");
        let picked = Detection::new(
            "a",
            Utc.timestamp_opt(1_700_000_120, 0).unwrap(),
            3,
            11.0,
            9.0,
            ThresholdKind::Mad,
            8.0,
            DetectionKind::Corr,
        );
        let event = DerivedEvent::for_detection(&picked);
        family.append(picked.with_event(event.clone())).unwrap();
        writer.write_family(&family).await.unwrap();
        writer.flush().await.unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let (event_id, json): (String, String) = conn
            .query_row(
                "SELECT event_id, event_json FROM detections WHERE event_json IS NOT NULL",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(event_id, event.resource_id);
        assert_eq!(parsed["resource_id"], event.resource_id.as_str());
        assert_eq!(parsed["comment"], event.comment.as_deref().unwrap());
        assert!(parsed["picks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_export_ignores_duplicates() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("families.db");
        let mut writer = SqliteFamilyWriter::new(&db_path).unwrap();

        let family = create_test_family("a");
        writer.write_family(&family).await.unwrap();
        writer.write_family(&family).await.unwrap();
        writer.flush().await.unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM detections", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
