//! Core domain model for RMH: the unified meeting record and its provenance tag.

use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "rmh-core";

/// Weekday names indexed by the numeric weekday convention used by the
/// BMLT-style search API: Monday = 0 through Sunday = 6.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Resolves a numeric weekday index to its name. An index outside 0..=6 is a
/// data defect on the caller's side and yields `None` instead of wrapping.
pub fn weekday_name(index: usize) -> Option<&'static str> {
    WEEKDAY_NAMES.get(index).copied()
}

/// Origin site a record was extracted from. Serialized as the origin hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "aaboston.org")]
    AaBoston,
    #[serde(rename = "nerna.org")]
    Nerna,
    #[serde(rename = "na.org")]
    NaOrg,
    #[serde(rename = "indyaa.org")]
    IndyAa,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::AaBoston => "aaboston.org",
            Source::Nerna => "nerna.org",
            Source::NaOrg => "na.org",
            Source::IndyAa => "indyaa.org",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified output record shared by every source adapter.
///
/// Optional fields are omitted from the serialized form when the origin site
/// never exposes them; a field the origin exposes but leaves blank is carried
/// as an empty string. Adapters never fabricate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMeeting {
    /// Source-local identifier; unique only within one source.
    pub code: String,
    /// Loose human-readable "Weekday, HH:MM"-style composite, not a timestamp.
    pub datetime: String,
    pub town: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Venue name, or a "lat, lon" pair for the geocoordinate-only source.
    pub location: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// Meeting format codes or labels; always present, possibly empty.
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_description: Option<String>,
    /// Opaque source-provided update stamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Contact emails with any `mailto:` prefix stripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<String>>,
    pub source: Source,
}
