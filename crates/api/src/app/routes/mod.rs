use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod system;
pub mod users;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .route("/api/users", post(users::create_user))
        .route("/api/users/:id", get(users::get_user).patch(users::update_user))
}
