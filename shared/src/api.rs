use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{DEFAULT_DURATION_MINUTES, DEFAULT_TIMEZONE};
use crate::time::Timestamp;

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

// ============================================================================
// Meeting API Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMeetingRequest {
    #[validate(length(min = 1, max = 1024))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub start_time: Timestamp,

    #[serde(default = "default_duration")]
    #[validate(range(min = 1))]
    pub duration: u32,

    #[serde(default = "default_timezone")]
    #[validate(length(min = 1))]
    pub timezone: String,

    #[serde(default)]
    pub attendees: Vec<String>,
}

/// Partial update: `None` leaves the remote value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateMeetingRequest {
    #[validate(length(min = 1, max = 1024))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub start_time: Option<Timestamp>,

    #[validate(range(min = 1))]
    pub duration: Option<u32>,

    #[validate(length(min = 1))]
    pub timezone: Option<String>,

    pub attendees: Option<Vec<String>>,
}

impl UpdateMeetingRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.duration.is_none()
            && self.timezone.is_none()
            && self.attendees.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMeetingsQuery {
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteMeetingResponse {
    pub message: String,
}

impl DeleteMeetingResponse {
    pub fn for_meeting(id: &str) -> Self {
        Self {
            message: format!("Meeting {} deleted successfully", id),
        }
    }
}

// ============================================================================
// Service Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfoResponse {
    pub title: String,
    pub version: String,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
