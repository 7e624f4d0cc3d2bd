//! Translation between `Meeting` and the provider's event resource.
//!
//! Duration is never stored remotely: it becomes the event end on write and
//! is derived from end minus start on read.

use chrono::{DateTime, Duration, FixedOffset, Offset, TimeZone};
use chrono_tz::Tz;
use meet_shared::api::{CreateMeetingRequest, UpdateMeetingRequest};
use meet_shared::models::{DEFAULT_DURATION_MINUTES, DEFAULT_TIMEZONE};
use meet_shared::{Meeting, Timestamp};

use crate::calendar::schema::{
    ConferenceData, CreateConferenceRequest, Event, EventAttendee, EventDateTime,
    VIDEO_ENTRY_POINT,
};
use crate::error::ServiceError;

pub fn parse_timezone(name: &str) -> Result<Tz, ServiceError> {
    name.parse::<Tz>()
        .map_err(|_| ServiceError::validation(format!("Unknown timezone: {}", name)))
}

/// Express `at` in `tz`, keeping the zone's offset at that instant.
fn in_zone<O: TimeZone>(at: &DateTime<O>, tz: Tz) -> DateTime<FixedOffset> {
    let local = at.with_timezone(&tz);
    local.with_timezone(&local.offset().fix())
}

/// Pin a client-supplied start time to an instant in `tz`.
///
/// Naive readings are wall-clock time in `tz`. When a DST transition makes
/// the reading ambiguous the earlier instant wins.
pub fn resolve_start(start: &Timestamp, tz: Tz) -> Result<DateTime<FixedOffset>, ServiceError> {
    match start {
        Timestamp::Zoned(at) => Ok(in_zone(at, tz)),
        Timestamp::Local(naive) => tz
            .from_local_datetime(naive)
            .earliest()
            .map(|at| in_zone(&at, tz))
            .ok_or_else(|| {
                ServiceError::validation(format!("{} does not exist in {}", naive, tz.name()))
            }),
    }
}

/// End of a meeting lasting `minutes` from `start`.
fn end_after(
    start: DateTime<FixedOffset>,
    minutes: u32,
) -> Result<DateTime<FixedOffset>, ServiceError> {
    start
        .checked_add_signed(Duration::minutes(i64::from(minutes)))
        .ok_or_else(|| {
            ServiceError::validation(format!(
                "A {} minute meeting starting at {} ends out of range",
                minutes, start
            ))
        })
}

fn set_time(slot: &mut Option<EventDateTime>, at: DateTime<FixedOffset>, timezone: &str) {
    let slot = slot.get_or_insert_with(EventDateTime::default);
    slot.date_time = Some(at.to_rfc3339());
    slot.date = None;
    slot.time_zone = Some(timezone.to_string());
}

fn attendees(emails: &[String]) -> Vec<EventAttendee> {
    emails.iter().map(EventAttendee::with_email).collect()
}

/// Build the insert payload for a new meeting, including the Meet
/// provisioning request.
pub fn new_event(request: &CreateMeetingRequest) -> Result<Event, ServiceError> {
    let tz = parse_timezone(&request.timezone)?;
    let start = resolve_start(&request.start_time, tz)?;
    let end = end_after(start, request.duration)?;

    let mut event = Event {
        summary: Some(request.title.clone()),
        description: Some(request.description.clone()),
        attendees: Some(attendees(&request.attendees)),
        conference_data: Some(ConferenceData {
            create_request: Some(CreateConferenceRequest::meet()),
            ..Default::default()
        }),
        ..Default::default()
    };
    set_time(&mut event.start, start, tz.name());
    set_time(&mut event.end, end, tz.name());

    Ok(event)
}

/// Overwrite the fields present in `update`, leaving the rest of `event`
/// as the provider returned it.
pub fn apply_update(event: &mut Event, update: &UpdateMeetingRequest) -> Result<(), ServiceError> {
    if let Some(title) = &update.title {
        event.summary = Some(title.clone());
    }
    if let Some(description) = &update.description {
        event.description = Some(description.clone());
    }
    if let Some(emails) = &update.attendees {
        event.attendees = Some(attendees(emails));
    }

    let timezone = match &update.timezone {
        Some(name) => Some(parse_timezone(name)?),
        None => None,
    };

    if update.start_time.is_none() && update.duration.is_none() {
        if let Some(tz) = timezone {
            for slot in [&mut event.start, &mut event.end].into_iter().flatten() {
                slot.time_zone = Some(tz.name().to_string());
            }
        }
        return Ok(());
    }

    let tz = timezone.unwrap_or_else(|| event_zone(event));
    let start = match &update.start_time {
        Some(start) => resolve_start(start, tz)?,
        // Duration alone moves the end and keeps the start
        None => in_zone(&event_start(event)?, tz),
    };
    let end = end_after(start, update.duration.unwrap_or(DEFAULT_DURATION_MINUTES))?;

    set_time(&mut event.start, start, tz.name());
    set_time(&mut event.end, end, tz.name());
    Ok(())
}

/// Zone of the event start, UTC when absent or unknown.
fn event_zone(event: &Event) -> Tz {
    event
        .start
        .as_ref()
        .and_then(|s| s.time_zone.as_deref())
        .and_then(|name| name.parse().ok())
        .unwrap_or(Tz::UTC)
}

fn parse_remote_time(value: &str) -> Result<DateTime<FixedOffset>, ServiceError> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| ServiceError::remote(format!("Invalid event time {:?}: {}", value, e)))
}

fn event_start(event: &Event) -> Result<DateTime<FixedOffset>, ServiceError> {
    let value = event
        .start
        .as_ref()
        .and_then(|s| s.date_time.as_deref())
        .ok_or_else(|| ServiceError::remote("Event has no start time"))?;
    parse_remote_time(value)
}

/// Events the listing reports: timed, with conferencing attached.
pub fn is_listable(event: &Event) -> bool {
    event.conference_data.is_some()
        && event
            .start
            .as_ref()
            .is_some_and(|s| s.date_time.is_some())
}

/// URI of the first video entry point, empty until one is provisioned.
pub fn meet_link(event: &Event) -> String {
    event
        .conference_data
        .as_ref()
        .and_then(|data| {
            data.entry_points
                .iter()
                .find(|entry| entry.entry_point_type == VIDEO_ENTRY_POINT)
        })
        .map(|entry| entry.uri.clone())
        .unwrap_or_default()
}

/// Whole minutes between start and end, rounded to nearest, never negative.
pub fn derive_duration(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> u32 {
    let seconds = (end - start).num_seconds().max(0);
    (seconds as f64 / 60.0).round() as u32
}

pub fn meeting_from_event(event: &Event) -> Result<Meeting, ServiceError> {
    let id = event
        .id
        .clone()
        .ok_or_else(|| ServiceError::remote("Event has no id"))?;

    let zone_name = event.start.as_ref().and_then(|s| s.time_zone.as_deref());
    let (tz, timezone) = match zone_name.and_then(|name| name.parse::<Tz>().ok()) {
        Some(tz) => (tz, tz.name().to_string()),
        None => (Tz::UTC, DEFAULT_TIMEZONE.to_string()),
    };

    let start = event_start(event)?;
    let duration = match event.end.as_ref().and_then(|e| e.date_time.as_deref()) {
        Some(end) => derive_duration(start, parse_remote_time(end)?),
        None => 0,
    };

    let attendees = event
        .attendees
        .iter()
        .flatten()
        .filter(|a| !a.email.is_empty())
        .map(|a| a.email.clone())
        .collect();

    Ok(Meeting {
        id,
        title: event.summary.clone().unwrap_or_default(),
        description: event.description.clone().unwrap_or_default(),
        start_time: in_zone(&start, tz),
        duration,
        timezone,
        attendees,
        meet_link: meet_link(event),
    })
}
