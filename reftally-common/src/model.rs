//! Scoring data model shared by the live service and the exporter

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Role of a counter within one referee slot
///
/// A referee in DUAL mode owns exactly one device of each role; in SINGLE
/// mode only PRIMARY exists. The uppercase form appears in log file names
/// and the DeviceRole log column, so it is part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceRole {
    Primary,
    Secondary,
}

impl DeviceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceRole::Primary => "PRIMARY",
            DeviceRole::Secondary => "SECONDARY",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeviceRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PRIMARY" => Ok(DeviceRole::Primary),
            "SECONDARY" => Ok(DeviceRole::Secondary),
            other => Err(Error::InvalidInput(format!("unknown device role: {other}"))),
        }
    }
}

/// Operating mode of one referee slot, fixed at configuration time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefereeMode {
    #[default]
    Single,
    Dual,
}

impl RefereeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefereeMode::Single => "single",
            RefereeMode::Dual => "dual",
        }
    }
}

impl fmt::Display for RefereeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RefereeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(RefereeMode::Single),
            "dual" => Ok(RefereeMode::Dual),
            other => Err(Error::InvalidInput(format!("unknown referee mode: {other}"))),
        }
    }
}

/// Authoritative score snapshot for one referee slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub total: i32,
    pub plus: i32,
    pub minus: i32,
}

/// One referee slot in a setup request
///
/// `primary`/`secondary` are device ids from the discovery list. A missing
/// or unknown device leaves that binding empty rather than failing the
/// whole setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeSpec {
    pub index: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mode: RefereeMode,
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
}
