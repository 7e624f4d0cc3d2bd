//! Meeting operations on top of the calendar provider.
//!
//! Each operation validates its input, makes one provider call (update makes
//! a read and a write) and translates the result back into a `Meeting`.

pub mod mapping;

use chrono::{DateTime, Duration, TimeZone, Utc};
use meet_shared::api::{CreateMeetingRequest, ListMeetingsQuery, UpdateMeetingRequest};
use meet_shared::{Meeting, Timestamp};
use validator::Validate;

use crate::calendar::CalendarClient;
use crate::error::ServiceError;

/// Length of the listing window when the caller gives no end date.
const DEFAULT_LIST_WINDOW_DAYS: i64 = 7;

pub struct MeetingService {
    calendar: CalendarClient,
}

impl MeetingService {
    pub fn new(calendar: CalendarClient) -> Self {
        Self { calendar }
    }

    pub async fn create(&self, request: &CreateMeetingRequest) -> Result<Meeting, ServiceError> {
        request.validate()?;
        let event = mapping::new_event(request)?;

        let created = self.calendar.insert_event(&event).await?;
        let meeting = mapping::meeting_from_event(&created)?;

        tracing::info!("Created meeting {} ({})", meeting.id, meeting.title);
        if meeting.meet_link.is_empty() {
            tracing::warn!("Meeting {} has no Meet link yet", meeting.id);
        }
        Ok(meeting)
    }

    pub async fn get(&self, id: &str) -> Result<Meeting, ServiceError> {
        require_id(id)?;
        let event = self.calendar.get_event(id).await?;
        mapping::meeting_from_event(&event)
    }

    /// Meetings starting within the window, earliest first. Events without
    /// conferencing or with an all-day start are left out.
    pub async fn list(&self, query: &ListMeetingsQuery) -> Result<Vec<Meeting>, ServiceError> {
        let (start, end) = resolve_window(query, Utc::now())?;
        tracing::debug!("Listing meetings from {} to {}", start, end);

        let events = self.calendar.list_events(start, end).await?;

        let mut meetings = events
            .iter()
            .filter(|event| mapping::is_listable(event))
            .map(mapping::meeting_from_event)
            .collect::<Result<Vec<_>, _>>()?;

        meetings.retain(|m| {
            let at = m.start_time.with_timezone(&Utc);
            start <= at && at < end
        });
        meetings.sort_by_key(|m| m.start_time);

        tracing::debug!("Found {} meetings", meetings.len());
        Ok(meetings)
    }

    pub async fn update(
        &self,
        id: &str,
        update: &UpdateMeetingRequest,
    ) -> Result<Meeting, ServiceError> {
        require_id(id)?;
        update.validate()?;

        let mut event = self.calendar.get_event(id).await?;
        mapping::apply_update(&mut event, update)?;

        let updated = self.calendar.update_event(id, &event).await?;
        tracing::info!("Updated meeting {}", id);
        mapping::meeting_from_event(&updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        require_id(id)?;
        self.calendar.delete_event(id).await?;
        tracing::info!("Deleted meeting {}", id);
        Ok(())
    }
}

fn require_id(id: &str) -> Result<(), ServiceError> {
    if id.trim().is_empty() {
        return Err(ServiceError::validation("Meeting id must not be empty"));
    }
    Ok(())
}

/// Query bounds without an offset are read as UTC.
fn to_utc(timestamp: &Timestamp) -> DateTime<Utc> {
    match timestamp {
        Timestamp::Zoned(at) => at.with_timezone(&Utc),
        Timestamp::Local(naive) => Utc.from_utc_datetime(naive),
    }
}

fn resolve_window(
    query: &ListMeetingsQuery,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let start = query.start_date.as_ref().map(to_utc).unwrap_or(now);
    let end = match query.end_date.as_ref() {
        Some(end) => to_utc(end),
        None => start
            .checked_add_signed(Duration::days(DEFAULT_LIST_WINDOW_DAYS))
            .ok_or_else(|| {
                ServiceError::validation(format!("start_date {} leaves no listing window", start))
            })?,
    };

    if start > end {
        return Err(ServiceError::validation(format!(
            "start_date {} is after end_date {}",
            start, end
        )));
    }
    Ok((start, end))
}
