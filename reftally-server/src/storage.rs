//! Append-only event log writer
//!
//! One CSV store per (group, refereeIndex, role). Every append opens,
//! writes, and closes the store so a crash loses at most the record being
//! written. Write failures are logged and swallowed; the live scoring path
//! never depends on log durability.

use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use reftally_common::event_log::{log_file_name, sanitize_component, LogRecord, LOG_HEADER};
use reftally_common::model::DeviceRole;
use reftally_common::protocol::ClickEvent;
use reftally_common::Result;

#[derive(Debug, Clone)]
pub struct EventLogWriter {
    data_dir: PathBuf,
}

impl EventLogWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn store_path(&self, group: &str, index: u32, role: DeviceRole) -> PathBuf {
        self.data_dir
            .join(sanitize_component(group))
            .join(log_file_name(index, role))
    }

    /// Ensure the store for the triple exists, writing the header row on
    /// first creation; idempotent
    pub async fn init_log(&self, group: &str, index: u32, role: DeviceRole) -> Result<()> {
        self.ensure_store(&self.store_path(group, index, role))
            .await
    }

    /// Append one record, stamped with the current wall-clock time
    ///
    /// A failed write is logged and swallowed.
    pub async fn append(
        &self,
        group: &str,
        index: u32,
        role: DeviceRole,
        event: &ClickEvent,
        contestant: &str,
    ) {
        let record = LogRecord::from_event(role, contestant, event, Local::now().naive_local());
        if let Err(e) = self.try_append(group, index, role, &record).await {
            warn!(
                group,
                index,
                role = %role,
                "event log write failed, record lost: {}",
                e
            );
        }
    }

    async fn try_append(
        &self,
        group: &str,
        index: u32,
        role: DeviceRole,
        record: &LogRecord,
    ) -> Result<()> {
        let path = self.store_path(group, index, role);
        self.ensure_store(&path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await?;
        file.write_all(format!("{}\n", record.to_row()).as_bytes())
            .await?;
        file.flush().await?;
        Ok(())
    }

    async fn ensure_store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if !tokio::fs::try_exists(path).await? {
            tokio::fs::write(path, format!("{LOG_HEADER}\n")).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(plus: i32, minus: i32) -> ClickEvent {
        ClickEvent {
            current_total: plus - minus,
            event_type: 1,
            total_plus: plus,
            total_minus: minus,
            device_timestamp_ms: 500,
        }
    }

    #[tokio::test]
    async fn init_creates_store_with_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer = EventLogWriter::new(dir.path());

        writer
            .init_log("finals", 0, DeviceRole::Primary)
            .await
            .unwrap();
        writer
            .init_log("finals", 0, DeviceRole::Primary)
            .await
            .unwrap();

        let path = dir.path().join("finals").join("referee_0_PRIMARY.csv");
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, format!("{LOG_HEADER}\n"));
    }

    #[tokio::test]
    async fn append_writes_parseable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = EventLogWriter::new(dir.path());

        writer
            .append("finals", 1, DeviceRole::Secondary, &click(2, 1), "Lee")
            .await;
        writer
            .append("finals", 1, DeviceRole::Secondary, &click(3, 1), "Lee")
            .await;

        let path = dir.path().join("finals").join("referee_1_SECONDARY.csv");
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3, "header plus two records");
        assert_eq!(lines[0], LOG_HEADER);

        let record = LogRecord::parse_row(lines[2]).unwrap();
        assert_eq!(record.contestant, "Lee");
        assert_eq!(record.total_plus, 3);
        assert_eq!(record.role, DeviceRole::Secondary);
    }

    #[tokio::test]
    async fn group_names_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let writer = EventLogWriter::new(dir.path());

        writer
            .append("Spring Open/2026", 0, DeviceRole::Primary, &click(1, 0), "")
            .await;

        assert!(dir.path().join("Spring_Open_2026").is_dir());
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();

        // data_dir is a file, every write fails, append must not panic
        let writer = EventLogWriter::new(&blocker);
        writer
            .append("finals", 0, DeviceRole::Primary, &click(1, 0), "Lee")
            .await;
    }
}
