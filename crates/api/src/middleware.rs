use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CallerContext;

/// Resolve the bearer session into a [`CallerContext`].
///
/// Missing or unknown sessions are 401. Role resolution never fails the
/// request: an unresolved role is left for the gate to deny.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .map_err(|_| errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing bearer session"))?;

    let principal = match services.resolve_principal(token).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            return Err(errors::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "session is invalid or expired",
            ));
        }
        Err(err) => {
            tracing::error!(error = %err, code = err.code.as_deref(), "session resolution failed");
            return Err(errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "identity_store_error",
                "could not resolve session",
            ));
        }
    };

    req.extensions_mut().insert(CallerContext::new(principal));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123 "));
        assert_eq!(extract_bearer(&headers), Ok("abc123"));
    }

    #[test]
    fn other_schemes_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));
    }
}
