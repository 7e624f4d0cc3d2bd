use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A point in time as supplied by a client.
///
/// Clients may send either an offset-qualified RFC 3339 timestamp
/// (`2024-01-02T09:00:00+01:00`) or a naive wall-clock reading
/// (`2024-01-02T09:00:00`). A naive reading only becomes an instant once it
/// is paired with a timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Zoned(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}
