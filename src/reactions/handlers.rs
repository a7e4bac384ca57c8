use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::{auth::jwt::Identity, error::ApiError, messages::repo::Message, state::AppState};

use super::{engine::apply_reaction, repo::ReactionState};

#[instrument(skip(state, identity))]
pub async fn like_message(
    State(state): State<AppState>,
    identity: Identity,
    Path(message_id): Path<i64>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = apply_reaction(&state.db, identity.0, message_id, ReactionState::Liked).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state, identity))]
pub async fn dislike_message(
    State(state): State<AppState>,
    identity: Identity,
    Path(message_id): Path<i64>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message =
        apply_reaction(&state.db, identity.0, message_id, ReactionState::Disliked).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
