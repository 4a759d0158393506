//! Compact duration strings (`45s`, `30m`, `2h`, `1d`) and their serde form.

use chrono::Duration;

/// Error returned for a malformed duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration {0:?} (expected e.g. 45s, 30m, 2h, 1d)")]
pub struct ParseDurationError(pub String);

/// Parses a compact duration. A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let s = input.trim();
    let err = || ParseDurationError(input.to_owned());
    if s.is_empty() {
        return Err(err());
    }

    let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, "s"),
    };
    let n: i64 = digits.parse().map_err(|_| err())?;

    let secs = match unit {
        "s" => Some(n),
        "m" => n.checked_mul(60),
        "h" => n.checked_mul(3_600),
        "d" => n.checked_mul(86_400),
        _ => None,
    }
    .ok_or_else(err)?;

    duration_from_secs(secs).map_err(|_| err())
}

/// Whole seconds as a `Duration`, rejecting counts chrono cannot represent.
pub fn duration_from_secs(secs: i64) -> Result<Duration, ParseDurationError> {
    Duration::try_seconds(secs).ok_or_else(|| ParseDurationError(secs.to_string()))
}

/// Renders a duration with the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds();
    if secs != 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs != 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Serde support for `chrono::Duration` stored as whole seconds.
pub mod duration_secs {
    use chrono::Duration;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = i64::deserialize(deserializer)?;
        super::duration_from_secs(secs).map_err(D::Error::custom)
    }
}
