use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::channels::ChannelError;

/// One alert that was delivered on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntry {
    pub message: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub hash: String,
}

/// Result of a deduplicated dispatch.
#[derive(Debug)]
pub enum DispatchOutcome {
    Sent,
    Suppressed,
    SendFailed(ChannelError),
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Suppressed => "suppressed",
            Self::SendFailed(_) => "send_failed",
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Accepts RFC 3339 instants as well as offset-less local timestamps
/// (`2026-01-20T21:03:04.123456`), which older history files contain.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = trimmed.parse::<NaiveDateTime>().ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
