//! Final-score report aggregation over stored event logs
//!
//! Scans every group directory under the data dir and reduces each PRIMARY
//! store to the last written record per contestant. Final standings read
//! PRIMARY stores only; SECONDARY detail stays on disk for other tooling.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::event_log::{parse_log_file_name, sanitize_component, LogRecord};
use crate::model::{DeviceRole, Score};

/// Final standings for one contestant in one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub group: String,
    pub contestant: String,
    /// refereeIndex → that referee's last recorded score
    pub scores: BTreeMap<u32, Score>,
}

/// Aggregate final standings across every group under `data_dir`
///
/// The last record per (group, contestant, referee) wins, in write order.
/// Unreadable files, foreign file names, and unparseable rows are skipped;
/// records with an empty contestant never count as a score.
pub fn load_report(data_dir: &Path) -> Vec<ReportRow> {
    let mut rows: BTreeMap<(String, String), BTreeMap<u32, Score>> = BTreeMap::new();
    if !data_dir.is_dir() {
        return Vec::new();
    }

    for entry in WalkDir::new(data_dir).min_depth(2).max_depth(2) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry in report scan: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let Some((index, role)) = parse_log_file_name(&name) else {
            continue;
        };
        if role != DeviceRole::Primary {
            continue;
        }
        let Some(group) = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .map(|g| g.to_string_lossy().into_owned())
        else {
            continue;
        };

        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!("skipping unreadable store {}: {}", entry.path().display(), e);
                continue;
            }
        };
        for line in content.lines() {
            let Ok(record) = LogRecord::parse_row(line) else {
                continue;
            };
            if record.contestant.is_empty() {
                continue;
            }
            rows.entry((group.clone(), record.contestant.clone()))
                .or_default()
                .insert(
                    index,
                    Score {
                        total: record.current_total,
                        plus: record.total_plus,
                        minus: record.total_minus,
                    },
                );
        }
    }

    rows.into_iter()
        .map(|((group, contestant), scores)| ReportRow {
            group,
            contestant,
            scores,
        })
        .collect()
}

/// Distinct contestants with any scored record in one group, sorted
///
/// Unlike [`load_report`], this looks at stores of every role.
pub fn scored_players(data_dir: &Path, group: &str) -> Vec<String> {
    let group_dir = data_dir.join(sanitize_component(group));
    let mut players = BTreeSet::new();
    if !group_dir.is_dir() {
        return Vec::new();
    }

    for entry in WalkDir::new(&group_dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry in player scan: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if parse_log_file_name(&entry.file_name().to_string_lossy()).is_none() {
            continue;
        }
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!("skipping unreadable store {}: {}", entry.path().display(), e);
                continue;
            }
        };
        for line in content.lines() {
            if let Ok(record) = LogRecord::parse_row(line) {
                if !record.contestant.is_empty() {
                    players.insert(record.contestant);
                }
            }
        }
    }

    players.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::{log_file_name, LOG_HEADER};
    use crate::protocol::ClickEvent;
    use chrono::NaiveDate;
    use std::fs;

    fn record(contestant: &str, total: i32, plus: i32, minus: i32, sec: u32) -> String {
        let event = ClickEvent {
            current_total: total,
            event_type: 1,
            total_plus: plus,
            total_minus: minus,
            device_timestamp_ms: sec * 1000,
        };
        let time = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_milli_opt(10, 0, sec, 0)
            .unwrap();
        LogRecord::from_event(DeviceRole::Primary, contestant, &event, time).to_row()
    }

    fn write_store(dir: &Path, group: &str, index: u32, role: DeviceRole, rows: &[String]) {
        let group_dir = dir.join(group);
        fs::create_dir_all(&group_dir).unwrap();
        let mut content = format!("{LOG_HEADER}\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(group_dir.join(log_file_name(index, role)), content).unwrap();
    }

    #[test]
    fn last_primary_record_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_store(
            dir.path(),
            "finals",
            0,
            DeviceRole::Primary,
            &[
                record("Lee", 1, 1, 0, 1),
                record("Lee", 2, 2, 0, 2),
                record("Kim", 5, 6, 1, 3),
            ],
        );

        let report = load_report(dir.path());
        assert_eq!(report.len(), 2);
        let lee = report.iter().find(|r| r.contestant == "Lee").unwrap();
        assert_eq!(lee.group, "finals");
        assert_eq!(
            lee.scores[&0],
            Score {
                total: 2,
                plus: 2,
                minus: 0
            }
        );
    }

    #[test]
    fn secondary_stores_do_not_feed_the_report() {
        let dir = tempfile::tempdir().unwrap();
        write_store(
            dir.path(),
            "finals",
            1,
            DeviceRole::Secondary,
            &[record("Lee", 3, 3, 0, 1)],
        );

        assert!(load_report(dir.path()).is_empty());
        // but any role marks the contestant as scored
        assert_eq!(scored_players(dir.path(), "finals"), vec!["Lee"]);
    }

    #[test]
    fn foreign_files_and_empty_contestants_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_store(
            dir.path(),
            "finals",
            0,
            DeviceRole::Primary,
            &[record("", 9, 9, 0, 1), record("Kim", 1, 1, 0, 2)],
        );
        fs::write(dir.path().join("finals").join("notes.csv"), "junk,junk\n").unwrap();

        let report = load_report(dir.path());
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].contestant, "Kim");
        assert_eq!(scored_players(dir.path(), "finals"), vec!["Kim"]);
    }

    #[test]
    fn missing_directories_yield_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_report(&dir.path().join("absent")).is_empty());
        assert!(scored_players(dir.path(), "absent").is_empty());
    }
}
