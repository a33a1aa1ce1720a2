use axum::Router;

pub mod system;
pub mod users;

/// Router for all session-authenticated endpoints.
pub fn router() -> Router {
    Router::new().nest("/admin", users::router())
}
