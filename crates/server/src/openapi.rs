use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(ToSchema)]
pub struct UserRecordDoc {
    /// `[A-Za-z0-9_-]{1,128}`
    pub id: String,
    pub name: String,
    pub age: i64,
}

#[derive(ToSchema)]
pub struct SavedResponseDoc {
    pub message: String,
}

#[derive(ToSchema)]
pub struct UsersResponseDoc {
    pub users: Vec<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::record_store_health,
        crate::routes::users::add_user,
        crate::routes::users::list_users,
        crate::routes::users::get_user,
    ),
    components(schemas(HealthResponse, UserRecordDoc, SavedResponseDoc, UsersResponseDoc)),
    tags((name = "health"), (name = "users"))
)]
pub struct RecordStoreDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::cloud_proxy_health,
        crate::routes::billing::get_billing,
        crate::routes::permissions::get_permissions,
        crate::routes::permissions::remove_from_all_groups,
        crate::routes::permissions::add_to_group,
        crate::routes::cloudtrail::get_events,
    ),
    components(schemas(HealthResponse)),
    tags((name = "health"), (name = "billing"), (name = "permission"), (name = "cloudtrail"))
)]
pub struct CloudProxyDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_list_every_route() {
        let rs = RecordStoreDoc::openapi();
        for p in ["/user/add", "/users", "/user/{user_id}", "/health"] {
            assert!(rs.paths.paths.contains_key(p), "missing {p}");
        }
        let cp = CloudProxyDoc::openapi();
        for p in ["/billing", "/permission/{username}", "/permission/{username}/{new_group_name}", "/cloudtrail"] {
            assert!(cp.paths.paths.contains_key(p), "missing {p}");
        }
    }
}
