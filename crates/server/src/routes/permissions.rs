use axum::{
    extract::{Path, State},
    Json,
};
use models::permission::GroupPermissions;

use super::CloudProxyState;
use crate::errors::ApiError;

/// Groups of a user with the managed policies attached to each.
#[utoipa::path(
    get,
    path = "/permission/{username}",
    tag = "permission",
    params(("username" = String, Path, description = "IAM user name")),
    responses(
        (status = 200, description = "Groups and attached policies"),
        (status = 502, description = "IAM call failed")
    )
)]
pub async fn get_permissions(
    State(state): State<CloudProxyState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<GroupPermissions>>, ApiError> {
    let perms = state.service.get_user_permissions(&username).await.map_err(|e| state.error(e))?;
    Ok(Json(perms))
}

#[utoipa::path(
    delete,
    path = "/permission/{username}",
    tag = "permission",
    params(("username" = String, Path, description = "IAM user name")),
    responses(
        (status = 200, description = "Confirmation text", body = String),
        (status = 502, description = "IAM call failed; earlier removals are kept")
    )
)]
pub async fn remove_from_all_groups(
    State(state): State<CloudProxyState>,
    Path(username): Path<String>,
) -> Result<Json<String>, ApiError> {
    let msg = state
        .service
        .remove_user_from_all_groups(&username)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(msg))
}

#[utoipa::path(
    put,
    path = "/permission/{username}/{new_group_name}",
    tag = "permission",
    params(
        ("username" = String, Path, description = "IAM user name"),
        ("new_group_name" = String, Path, description = "Group to join")
    ),
    responses(
        (status = 200, description = "Confirmation text", body = String),
        (status = 502, description = "IAM call failed")
    )
)]
pub async fn add_to_group(
    State(state): State<CloudProxyState>,
    Path((username, new_group_name)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    let msg = state
        .service
        .add_user_to_group(&username, &new_group_name)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(msg))
}
