use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};

use lexportal_core::AccountId;
use lexportal_provisioning::AuditOrigin;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", delete(delete_user))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", rejection.body_text());
        }
    };

    match services
        .provisioning()
        .provision_account(&caller.caller(), AuditOrigin::Session, &body)
        .await
    {
        Ok(account) => (
            StatusCode::CREATED,
            Json(dto::CreatedUserResponse {
                success: true,
                user: dto::UserDto::from(&account),
            }),
        )
            .into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", format!("{e}")),
    };

    match services
        .provisioning()
        .deprovision_account(&caller.caller(), AuditOrigin::Session, &id)
        .await
    {
        Ok(deleted) => (StatusCode::OK, Json(dto::DeletedUserResponse::from(&deleted))).into_response(),
        Err(e) => errors::provisioning_error_to_response(e),
    }
}
