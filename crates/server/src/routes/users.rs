use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use models::user_record::UserRecord;
use serde::Serialize;
use tracing::info;

use super::RecordStoreState;
use crate::errors::JsonApiError;

#[derive(Serialize)]
pub struct SavedResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<String>,
}

/// Save a record, replacing any previous one with the same id.
#[utoipa::path(
    post,
    path = "/user/add",
    tag = "users",
    request_body = crate::openapi::UserRecordDoc,
    responses(
        (status = 200, description = "Saved", body = crate::openapi::SavedResponseDoc),
        (status = 400, description = "Invalid id"),
        (status = 422, description = "Body is not a user record"),
        (status = 500, description = "Write failed")
    )
)]
pub async fn add_user(
    State(state): State<RecordStoreState>,
    payload: Result<Json<UserRecord>, JsonRejection>,
) -> Result<Json<SavedResponse>, JsonApiError> {
    let Json(record) = payload?;
    let file_name = state.store.add(&record).await?;
    info!(id = %record.id, "add_user");
    Ok(Json(SavedResponse { message: format!("User data saved as {file_name}") }))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses((status = 200, description = "Ids of stored records", body = crate::openapi::UsersResponseDoc))
)]
pub async fn list_users(State(state): State<RecordStoreState>) -> Result<Json<UsersResponse>, JsonApiError> {
    let users = state.store.list().await?;
    Ok(Json(UsersResponse { users }))
}

#[utoipa::path(
    get,
    path = "/user/{user_id}",
    tag = "users",
    params(("user_id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Stored record", body = crate::openapi::UserRecordDoc),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<RecordStoreState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRecord>, JsonApiError> {
    Ok(Json(state.store.get(&user_id).await?))
}
