//! Public API surface for the profits backend.
//!
//! This file holds the record type returned by every endpoint and the
//! identifier type the store assigns to it. All types derive
//! Serialize/Deserialize for JSON serialization.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use crate::models::profit::{
    NewProfit, ProfitBody, ProfitChanges, ValidationErrors, ValidationIssue,
};

/// Number of bytes in a profit identifier.
pub const PROFIT_ID_LEN: usize = 12;

/// Store-assigned profit identifier.
///
/// Uses the document-store object-id layout: a 4-byte big-endian creation
/// timestamp (seconds), 5 bytes unique to the generating process and a
/// 3-byte big-endian counter. Externally it is always the 24-character
/// lowercase hex form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfitId([u8; PROFIT_ID_LEN]);

/// Error returned when a token is not a syntactically valid [`ProfitId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid profit id '{token}': expected {} hex characters", PROFIT_ID_LEN * 2)]
pub struct InvalidProfitId {
    pub token: String,
}

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

impl ProfitId {
    pub fn from_bytes(bytes: [u8; PROFIT_ID_LEN]) -> Self {
        ProfitId(bytes)
    }

    pub fn bytes(&self) -> [u8; PROFIT_ID_LEN] {
        self.0
    }

    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate an identifier stamped with `at` instead of the current time.
    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let process = PROCESS_UNIQUE.get_or_init(|| {
            let mut unique = [0u8; 5];
            unique.copy_from_slice(&uuid::Uuid::new_v4().as_bytes()[..5]);
            unique
        });
        let counter = COUNTER.get_or_init(|| {
            let seed = uuid::Uuid::new_v4().as_u128() as u32;
            // Start in the lower half so one process rarely wraps within a second.
            AtomicU32::new(seed & 0x007F_FFFF)
        });
        let count = counter.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;
        let seconds = at.timestamp().clamp(0, i64::from(u32::MAX)) as u32;

        let mut bytes = [0u8; PROFIT_ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        ProfitId(bytes)
    }

    /// Parse the 24-character hex form. Any other token is rejected.
    pub fn parse(token: &str) -> Result<Self, InvalidProfitId> {
        let invalid = || InvalidProfitId {
            token: token.to_string(),
        };
        if token.len() != PROFIT_ID_LEN * 2 {
            return Err(invalid());
        }
        let mut bytes = [0u8; PROFIT_ID_LEN];
        hex::decode_to_slice(token, &mut bytes).map_err(|_| invalid())?;
        Ok(ProfitId(bytes))
    }

    /// Creation time encoded in the identifier, to the second.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let mut seconds = [0u8; 4];
        seconds.copy_from_slice(&self.0[..4]);
        DateTime::from_timestamp(i64::from(u32::from_be_bytes(seconds)), 0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ProfitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ProfitId {
    type Err = InvalidProfitId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ProfitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProfitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        ProfitId::parse(&token).map_err(serde::de::Error::custom)
    }
}

/// A stored profit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profit {
    #[serde(rename = "_id")]
    pub id: ProfitId,
    pub amount: f64,
    pub name: String,
    #[serde(with = "year_format")]
    pub year: DateTime<Utc>,
}

impl Profit {
    /// Attach an identifier to a validated record.
    pub fn from_new(id: ProfitId, new: NewProfit) -> Self {
        Self {
            id,
            amount: new.amount,
            name: new.name,
            year: new.year,
        }
    }

    /// Overwrite the fields present in `changes`.
    pub fn apply(&mut self, changes: &ProfitChanges) {
        if let Some(amount) = changes.amount {
            self.amount = amount;
        }
        if let Some(ref name) = changes.name {
            self.name = name.clone();
        }
        if let Some(year) = changes.year {
            self.year = year;
        }
    }
}

/// Render a timestamp the way the HTTP API exposes it
/// (`2018-03-01T00:00:00.000Z`).
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a textual timestamp: RFC 3339, a zone-less date-time (read as UTC)
/// or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter for the `year` field: millisecond ISO-8601 on output,
/// ISO-8601 text or epoch milliseconds on input.
pub mod year_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawYear {
        Text(String),
        Millis(i64),
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match RawYear::deserialize(deserializer)? {
            RawYear::Text(text) => super::parse_timestamp(&text)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", text))),
            RawYear::Millis(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| serde::de::Error::custom(format!("date out of range: {}", ms))),
        }
    }
}
