use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::routes::AppState;
use meet_shared::api::{
    CreateMeetingRequest, DeleteMeetingResponse, ListMeetingsQuery, UpdateMeetingRequest,
};
use meet_shared::Meeting;

pub async fn create_meeting(
    State(state): State<AppState>,
    payload: Result<Json<CreateMeetingRequest>, JsonRejection>,
) -> ApiResult<Json<Meeting>> {
    let Json(payload) = payload?;
    let meeting = state.meetings.create(&payload).await?;
    Ok(Json(meeting))
}

pub async fn list_meetings(
    State(state): State<AppState>,
    query: Result<Query<ListMeetingsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Meeting>>> {
    let Query(query) = query?;
    let meetings = state.meetings.list(&query).await?;
    Ok(Json(meetings))
}

pub async fn get_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Meeting>> {
    let meeting = state.meetings.get(&id).await?;
    Ok(Json(meeting))
}

pub async fn update_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMeetingRequest>, JsonRejection>,
) -> ApiResult<Json<Meeting>> {
    let Json(payload) = payload?;
    if payload.is_empty() {
        return Err(ApiError::bad_request("Update must set at least one field"));
    }

    let meeting = state.meetings.update(&id, &payload).await?;
    Ok(Json(meeting))
}

pub async fn delete_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteMeetingResponse>> {
    state.meetings.delete(&id).await?;
    Ok(Json(DeleteMeetingResponse::for_meeting(&id)))
}
