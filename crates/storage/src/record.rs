//! Score log row format

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in the log (`2024-05-01 13:45:09`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the drowsiness log.
///
/// Field order is the column order: `timestamp,score,is_drowsy`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrowsinessRecord {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(with = "score")]
    pub score: f32,
    #[serde(with = "verdict")]
    pub is_drowsy: bool,
}

impl DrowsinessRecord {
    /// Stamp a verdict with the local wall clock, truncated to whole seconds
    pub fn now(is_drowsy: bool, score: f32) -> Self {
        let now = Local::now().naive_local();
        Self {
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            score,
            is_drowsy,
        }
    }
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
            .map_err(|e| de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
    }
}

mod score {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f32(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
        let value = f32::deserialize(d)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(de::Error::custom(format!("non-finite score {}", value)))
        }
    }
}

// Logs written by earlier deployments spell booleans `True`/`False`.
mod verdict {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(de::Error::custom(format!("invalid is_drowsy value {:?}", raw))),
        }
    }
}
