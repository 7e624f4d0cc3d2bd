use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Default meeting length in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Default timezone for meetings created without one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// A meeting as seen through the calendar provider.
///
/// Every field is read back from the provider's event. `duration` is derived
/// from the event's start and end, and `meet_link` is empty until the provider
/// has provisioned a video entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Start instant, expressed in `timezone`.
    pub start_time: DateTime<FixedOffset>,
    /// Length in whole minutes.
    pub duration: u32,
    /// IANA zone name, e.g. `Europe/Helsinki`.
    pub timezone: String,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub meet_link: String,
}
