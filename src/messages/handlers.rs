use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    auth::{jwt::Identity, repo::User},
    error::ApiError,
    state::AppState,
};

use super::{
    dto::{CreateMessageRequest, ListOptions, ListQuery},
    repo::Message,
};

const TITLE_LIMIT: usize = 2;
const CONTENT_LIMIT: usize = 4;

pub(crate) fn is_valid_title(title: &str) -> bool {
    title.chars().count() > TITLE_LIMIT
}

pub(crate) fn is_valid_content(content: &str) -> bool {
    content.chars().count() > CONTENT_LIMIT
}

#[instrument(skip(state, identity, payload))]
pub async fn create_message(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let (Some(title), Some(content)) = (payload.title, payload.content) else {
        return Err(ApiError::validation("missing parameters"));
    };

    if !is_valid_title(&title) || !is_valid_content(&content) {
        warn!("title or content too short");
        return Err(ApiError::validation("invalid parameters"));
    }

    let user_id = identity.0.ok_or(ApiError::NotFound("user"))?;
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let message = Message::create(
        &state.db,
        user.id,
        &title,
        &content,
        payload.attachment.as_deref(),
    )
    .await?;

    info!(message_id = %message.id, user_id = %user.id, "message created");
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let opts = ListOptions::from_query(query)?;
    let rows = Message::list(&state.db, &opts).await?;
    Ok(Json(super::dto::project(rows, opts.fields.as_deref())))
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn title_must_be_longer_than_two_chars() {
        assert!(!is_valid_title(""));
        assert!(!is_valid_title("ab"));
        assert!(is_valid_title("abc"));
    }

    #[test]
    fn content_must_be_longer_than_four_chars() {
        assert!(!is_valid_content("abcd"));
        assert!(is_valid_content("abcde"));
    }
}
