use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use lexportal_provisioning::ProvisioningError;

pub fn status_for(err: &ProvisioningError) -> StatusCode {
    match err {
        ProvisioningError::InvalidInput { .. } | ProvisioningError::Conflict { .. } => StatusCode::BAD_REQUEST,
        ProvisioningError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        ProvisioningError::Forbidden { .. } => StatusCode::FORBIDDEN,
        ProvisioningError::NotFound { .. } => StatusCode::NOT_FOUND,
        ProvisioningError::IdentityStore { .. }
        | ProvisioningError::ProfileStore { .. }
        | ProvisioningError::OrphanedIdentityRecord { .. }
        | ProvisioningError::PartialDelete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Single JSON outcome for a failed provisioning call.
///
/// Store diagnostic codes stay in the server log.
pub fn provisioning_error_to_response(err: ProvisioningError) -> axum::response::Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(
            error = %err,
            kind = err.kind(),
            code = err.code(),
            account_id = err.account_id().map(|id| id.as_str()),
            "provisioning failed"
        );
    }

    let mut body = json!({
        "success": false,
        "error": err.kind(),
        "message": err.message(),
    });
    if let Some(account_id) = err.account_id() {
        body["account_id"] = json!(account_id.as_str());
    }

    (status, axum::Json(body)).into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
