//! Append-only event-log codec
//!
//! One CSV store exists per (group, refereeIndex, role) at
//! `{data_dir}/{group}/referee_{index}_{ROLE}.csv`. The header row, column
//! order, and file naming are load-bearing: the exporter parses identity
//! from the name and columns by position, and third-party tooling reads the
//! same files. Do not reorder columns.
//!
//! Records are append-only. Nothing in reftally mutates or deletes a row
//! once written.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::DeviceRole;
use crate::protocol::ClickEvent;
use crate::{Error, Result};

/// Header row written when a store is first created
pub const LOG_HEADER: &str =
    "SystemTime,BLE_Timestamp,DeviceRole,Contestant,CurrentTotal,EventType,TotalPlus,TotalMinus";

/// Wall-clock receipt time format, millisecond precision
pub const SYSTEM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const FIELD_COUNT: usize = 8;

/// One persisted click event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub system_time: NaiveDateTime,
    pub device_timestamp_ms: u32,
    pub role: DeviceRole,
    pub contestant: String,
    pub current_total: i32,
    pub event_type: i8,
    pub total_plus: i32,
    pub total_minus: i32,
}

impl LogRecord {
    /// Build a record from a decoded event and its receipt time
    pub fn from_event(
        role: DeviceRole,
        contestant: &str,
        event: &ClickEvent,
        system_time: NaiveDateTime,
    ) -> Self {
        Self {
            system_time,
            device_timestamp_ms: event.device_timestamp_ms,
            role,
            contestant: contestant.to_string(),
            current_total: event.current_total,
            event_type: event.event_type,
            total_plus: event.total_plus,
            total_minus: event.total_minus,
        }
    }

    /// Render as one CSV row (no trailing newline)
    pub fn to_row(&self) -> String {
        let fields = [
            format_system_time(self.system_time),
            self.device_timestamp_ms.to_string(),
            self.role.to_string(),
            self.contestant.clone(),
            self.current_total.to_string(),
            self.event_type.to_string(),
            self.total_plus.to_string(),
            self.total_minus.to_string(),
        ];
        fields
            .iter()
            .map(|f| quote_field(f))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse one CSV row
    ///
    /// Rejects rows with a wrong field count or unparseable values; the
    /// caller skips the row and continues with the rest of the file.
    pub fn parse_row(line: &str) -> Result<Self> {
        let fields = split_row(line);
        if fields.len() != FIELD_COUNT {
            return Err(Error::InvalidInput(format!(
                "log row has {} fields, expected {FIELD_COUNT}",
                fields.len()
            )));
        }
        Ok(Self {
            system_time: parse_system_time(&fields[0])?,
            device_timestamp_ms: parse_num(&fields[1], "BLE_Timestamp")?,
            role: DeviceRole::from_str(&fields[2])?,
            contestant: fields[3].clone(),
            current_total: parse_num(&fields[4], "CurrentTotal")?,
            event_type: parse_num(&fields[5], "EventType")?,
            total_plus: parse_num(&fields[6], "TotalPlus")?,
            total_minus: parse_num(&fields[7], "TotalMinus")?,
        })
    }
}

/// Store file name for one (refereeIndex, role)
pub fn log_file_name(index: u32, role: DeviceRole) -> String {
    format!("referee_{index}_{role}.csv")
}

/// Recover (refereeIndex, role) from a store file name
///
/// `None` means the file is not a click-event store and the whole file is
/// skipped by readers.
pub fn parse_log_file_name(name: &str) -> Option<(u32, DeviceRole)> {
    let stem = name.strip_suffix(".csv")?;
    let rest = stem.strip_prefix("referee_")?;
    let (index, role) = rest.rsplit_once('_')?;
    Some((index.parse().ok()?, role.parse().ok()?))
}

pub fn format_system_time(t: NaiveDateTime) -> String {
    t.format(SYSTEM_TIME_FORMAT).to_string()
}

pub fn parse_system_time(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, SYSTEM_TIME_FORMAT)
        .map_err(|e| Error::InvalidInput(format!("bad SystemTime '{s}': {e}")))
}

/// Make a group or contestant name safe as a path component
///
/// Alphanumerics, `-` and `_` pass through; everything else becomes `_`.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn parse_num<T: FromStr>(field: &str, column: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("bad {column} value '{field}'")))
}

fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Quote-aware CSV field split
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }
    fields.push(current);
    fields
}
