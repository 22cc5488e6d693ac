//! Event-log loading for reconstruction
//!
//! Reads a completed group directory back into per-(contestant, referee)
//! event timelines. Only PRIMARY-role stores feed reconstruction. One bad
//! file, row, or field never aborts the load; the offending unit is
//! skipped and its siblings are kept.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use reftally_common::event_log::{parse_log_file_name, LogRecord};
use reftally_common::model::DeviceRole;

use crate::error::{Error, Result};

/// One reconstructed scoring event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    /// Wall-clock receipt time from the SystemTime column
    pub dt: NaiveDateTime,
    pub plus: i32,
    pub minus: i32,
    pub total: i32,
}

/// Event timelines keyed by (contestant, refereeIndex), each sorted by time
pub type GroupTimelines = BTreeMap<(String, u32), Vec<TimelineEvent>>;

/// Load every PRIMARY-role log store in a group directory
///
/// Files whose names do not parse as a log identity are ignored. Rows that
/// fail to parse (the header among them) and rows without a contestant are
/// skipped individually.
pub fn load_group(group_dir: &Path) -> Result<GroupTimelines> {
    if !group_dir.is_dir() {
        return Err(Error::GroupNotFound(group_dir.display().to_string()));
    }

    let mut timelines = GroupTimelines::new();
    for entry in WalkDir::new(group_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some((index, role)) = parse_log_file_name(name) else {
            debug!(file = name, "not a log store, ignored");
            continue;
        };
        if role != DeviceRole::Primary {
            continue;
        }
        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = name, "unreadable log store skipped: {}", e);
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
            timelines
                .entry((record.contestant.clone(), index))
                .or_default()
                .push(TimelineEvent {
                    dt: record.system_time,
                    plus: record.total_plus,
                    minus: record.total_minus,
                    total: record.current_total,
                });
        }
    }

    for events in timelines.values_mut() {
        events.sort_by_key(|e| e.dt);
    }
    Ok(timelines)
}
