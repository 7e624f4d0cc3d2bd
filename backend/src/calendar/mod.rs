//! Client for the Google Calendar v3 events API.

pub mod schema;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::CredentialManager;
use crate::error::ServiceError;
use schema::{ApiErrorBody, Event, EventList};

/// Client for one calendar, authenticated through the credential manager
pub struct CalendarClient {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
    credentials: Arc<CredentialManager>,
}

impl CalendarClient {
    pub fn new(base_url: &str, calendar_id: &str, credentials: Arc<CredentialManager>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            calendar_id: calendar_id.to_string(),
            credentials,
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// Create an event, asking the provider to attach conferencing.
    pub async fn insert_event(&self, event: &Event) -> Result<Event, ServiceError> {
        let request = self
            .http
            .post(self.events_url())
            .query(&[("conferenceDataVersion", "1")])
            .json(event);

        self.fetch(request, "insert event").await
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Event, ServiceError> {
        let request = self.http.get(self.event_url(event_id));
        self.fetch(request, event_id).await
    }

    /// Events overlapping `[time_min, time_max)`, recurring events expanded
    /// into instances, ordered by start time.
    pub async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<Event>, ServiceError> {
        let request = self.http.get(self.events_url()).query(&[
            (
                "timeMin",
                time_min.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "timeMax",
                time_max.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ]);

        let list: EventList = self.fetch(request, "list events").await?;
        if list.next_page_token.is_some() {
            tracing::debug!("Event list has further pages, returning the first page only");
        }
        Ok(list.items)
    }

    /// Replace an event, keeping its existing conference.
    pub async fn update_event(&self, event_id: &str, event: &Event) -> Result<Event, ServiceError> {
        let request = self
            .http
            .put(self.event_url(event_id))
            .query(&[("conferenceDataVersion", "1")])
            .json(event);

        self.fetch(request, event_id).await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), ServiceError> {
        let request = self.http.delete(self.event_url(event_id));
        self.send(request, event_id).await?;
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, ServiceError> {
        let response = self.send(request, context).await?;
        response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse calendar response: {:?}", e);
            ServiceError::remote(format!("Invalid response from Calendar API: {}", e))
        })
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, ServiceError> {
        let token = self.credentials.access_token().await?;

        let response = request.bearer_auth(token).send().await.map_err(|e| {
            tracing::warn!("Calendar API request failed: {:?}", e);
            ServiceError::remote(format!("Calendar API request failed: {}", e))
        })?;

        check_status(response, context).await
    }
}

/// Map provider failures onto the service error kinds, keeping the
/// provider's message.
async fn check_status(response: Response, context: &str) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);
    tracing::warn!("Calendar API error ({}) for {}: {}", status, context, message);

    Err(match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            ServiceError::NotFound(format!("{}: {}", context, message))
        }
        StatusCode::BAD_REQUEST => ServiceError::Validation(message),
        _ => ServiceError::Remote(format!("HTTP {}: {}", status, message)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_get_event_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events/evt1")
            .match_header("authorization", test_support::BEARER)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "evt1", "summary": "Standup"}"#)
            .create_async()
            .await;

        let client = test_support::calendar_client(&server);
        let event = client.get_event("evt1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(event.summary.as_deref(), Some("Standup"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/calendars/primary/events/missing")
            .with_status(404)
            .with_body(r#"{"error": {"code": 404, "message": "Not Found"}}"#)
            .create_async()
            .await;
        let _gone = server
            .mock("DELETE", "/calendars/primary/events/gone")
            .with_status(410)
            .with_body(r#"{"error": {"code": 410, "message": "Resource has been deleted"}}"#)
            .create_async()
            .await;
        let _rejected = server
            .mock("POST", "/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": {"code": 400, "message": "Invalid attendee email."}}"#)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/calendars/primary/events/boom")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let client = test_support::calendar_client(&server);

        match client.get_event("missing").await {
            Err(ServiceError::NotFound(msg)) => assert!(msg.contains("Not Found")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            client.delete_event("gone").await,
            Err(ServiceError::NotFound(_))
        ));
        match client.insert_event(&Event::default()).await {
            Err(ServiceError::Validation(msg)) => assert_eq!(msg, "Invalid attendee email."),
            other => panic!("unexpected: {:?}", other),
        }
        match client.get_event("boom").await {
            Err(ServiceError::Remote(msg)) => assert!(msg.contains("upstream exploded")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_events_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("timeMin".into(), "2024-01-01T00:00:00Z".into()),
                Matcher::UrlEncoded("timeMax".into(), "2024-01-08T00:00:00Z".into()),
                Matcher::UrlEncoded("singleEvents".into(), "true".into()),
                Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items": [{"id": "a"}, {"id": "b"}]}"#)
            .create_async()
            .await;

        let client = test_support::calendar_client(&server);
        let start = "2024-01-01T00:00:00Z".parse().unwrap();
        let end = "2024-01-08T00:00:00Z".parse().unwrap();
        let events = client.list_events(start, end).await.unwrap();

        mock.assert_async().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_remote_error() {
        let client = CalendarClient::new("http://127.0.0.1:9", "primary", test_support::credentials());

        assert!(matches!(
            client.get_event("x").await,
            Err(ServiceError::Remote(_))
        ));
    }
}
