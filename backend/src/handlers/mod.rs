pub mod meetings;

use axum::{extract::State, http::StatusCode, Json};
use meet_shared::api::ServiceInfoResponse;

use crate::routes::AppState;

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        title: state.api_title.clone(),
        version: state.api_version.clone(),
    })
}
