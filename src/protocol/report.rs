//! Report decoding and schema validation
//!
//! Reports are JSON objects keyed by fixed field names. A reply only counts
//! as a report when every field of the schema for its number is present;
//! anything less is rejected whole. Field values stay exactly as the device
//! sent them, no coercion to physical units happens here.

use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a reply failed to decode as a report
///
/// All of these are transient from the caller's point of view: the retry
/// loop in the client consumes them and re-runs the round-trip.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("No response from device")]
    NoResponse,

    #[error("Response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response is not a JSON object")]
    NotAnObject,

    #[error("Report {report} is missing field '{field}'")]
    MissingField { report: u32, field: &'static str },
}

/// Report categories served by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Report 1 - identity and firmware
    Device,
    /// Report 2 - charging state, limits and enablement
    Status,
    /// Report 3 - live metering values
    Metering,
    /// Reports 100 and up - charging session history
    Session,
}

impl ReportKind {
    /// Map a report number to its kind
    ///
    /// Returns `None` for numbers the device does not serve. Every number
    /// from 100 upward selects the session schema; the exact value only
    /// picks which history slot the device answers from.
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(ReportKind::Device),
            2 => Some(ReportKind::Status),
            3 => Some(ReportKind::Metering),
            n if n >= 100 => Some(ReportKind::Session),
            _ => None,
        }
    }

    /// Field names that must all be present for a report to be valid
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            ReportKind::Device => &[
                "ID",
                "Product",
                "Serial",
                "Firmware",
                "COM-module",
                "Backend",
                "timeQ",
                "Sec",
            ],
            ReportKind::Status => &[
                "ID",
                "State",
                "Error1",
                "Error2",
                "Plug",
                "AuthON",
                "Authreq",
                "Enable sys",
                "Enable user",
                "Max curr",
                "Max curr %",
                "Curr HW",
                "Curr user",
                "Curr FS",
                "Tmo FS",
                "Curr timer",
                "Tmo CT",
                "Setenergy",
                "Output",
                "Input",
                "Serial",
                "Sec",
            ],
            ReportKind::Metering => &[
                "ID", "U1", "U2", "U3", "I1", "I2", "I3", "P", "PF", "E pres", "E total", "Serial",
                "Sec",
            ],
            ReportKind::Session => &[
                "ID",
                "Session ID",
                "Curr HW",
                "E start",
                "E pres",
                "started[s]",
                "ended[s]",
                "started",
                "ended",
                "reason",
                "timeQ",
                "RFID tag",
                "RFID class",
                "Serial",
                "Sec",
            ],
        }
    }
}

/// A decoded, schema-checked report reply
#[derive(Debug, Clone)]
pub struct Report {
    number: u32,
    kind: ReportKind,
    fields: Map<String, Value>,
}

impl Report {
    /// Decode raw reply bytes and check them against the schema for `kind`
    pub fn parse(number: u32, kind: ReportKind, raw: &[u8]) -> Result<Self, ReportError> {
        let value: Value = serde_json::from_slice(raw)?;
        let fields = match value {
            Value::Object(map) => map,
            _ => return Err(ReportError::NotAnObject),
        };

        for &field in kind.required_fields() {
            if !fields.contains_key(field) {
                return Err(ReportError::MissingField { report: number, field });
            }
        }

        Ok(Self {
            number,
            kind,
            fields,
        })
    }

    /// The report number this reply answered
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The schema the reply was validated against
    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Look up a single field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields as the device sent them
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the report, keeping only the field mapping
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
