use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, Profile, RegisterRequest, UpdateProfileRequest},
        jwt::{Identity, JwtKeys},
        password::{hash_password, verify_password},
        repo::User,
    },
    error::ApiError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

// 4 to 8 characters, at least one digit.
pub(crate) fn is_valid_password(password: &str) -> bool {
    (4..=8).contains(&password.chars().count()) && password.chars().any(|c| c.is_ascii_digit())
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    (5..=12).contains(&username.chars().count())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (Some(email), Some(username), Some(password)) =
        (payload.email, payload.username, payload.password)
    else {
        return Err(ApiError::validation("missing parameters"));
    };
    let email = email.trim().to_lowercase();

    if !is_valid_username(&username) {
        warn!(%username, "invalid username");
        return Err(ApiError::validation(
            "username must be between 5 and 12 characters",
        ));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("invalid email"));
    }
    if !is_valid_password(&password) {
        warn!("invalid password");
        return Err(ApiError::validation("invalid password"));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::conflict("user already exists"));
    }
    if User::find_by_username(&state.db, &username).await?.is_some() {
        warn!(%username, "username already taken");
        return Err(ApiError::conflict("user already exists"));
    }

    let hash = hash_password(&password)?;
    let user = User::create(&state.db, &email, &username, &hash, payload.bio.as_deref()).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.is_admin)?;

    info!(user_id = %user.id, %email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::validation("missing parameters"));
    };
    let email = email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::auth("invalid password"));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.is_admin)?;

    info!(user_id = %user.id, %email, "user logged in");
    Ok(Json(AuthResponse {
        user_id: user.id,
        token,
    }))
}

#[instrument(skip(state, identity))]
pub async fn get_profile(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Profile>, ApiError> {
    let user_id = identity.0.ok_or_else(|| ApiError::auth("wrong token"))?;
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, identity, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let user_id = identity.0.ok_or_else(|| ApiError::auth("wrong token"))?;
    let user = User::update_bio(&state.db, user_id, payload.bio.as_deref())
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("spaced user@example.com"));
    }

    #[test]
    fn password_needs_a_digit_and_four_to_eight_chars() {
        assert!(is_valid_password("abc1"));
        assert!(is_valid_password("abcdefg1"));
        assert!(!is_valid_password("ab1"));
        assert!(!is_valid_password("abcdefgh1"));
        assert!(!is_valid_password("abcdefgh"));
    }

    #[test]
    fn username_is_five_to_twelve_chars() {
        assert!(is_valid_username("hello"));
        assert!(is_valid_username("twelve_chars"));
        assert!(!is_valid_username("four"));
        assert!(!is_valid_username("thirteen_char"));
    }
}
