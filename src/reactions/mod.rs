use axum::{routing::post, Router};

use crate::state::AppState;

pub mod engine;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/:message_id/like", post(handlers::like_message))
        .route(
            "/messages/:message_id/dislike",
            post(handlers::dislike_message),
        )
}
