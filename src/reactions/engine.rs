//! Like/dislike reconciliation.
//!
//! A reaction apply is one read-modify-write sequence over two shared rows:
//! the reaction join-row for (user, message) and the message's denormalized
//! like counter. The whole sequence runs in a single transaction that locks
//! the message row up front, so concurrent applies against the same message
//! serialize and `messages.likes` always equals the number of LIKED rows
//! once a call completes.

use sqlx::PgPool;
use tracing::{info, instrument};

use crate::{
    auth::repo::User,
    error::ApiError,
    messages::repo::Message,
};

use super::repo::{Reaction, ReactionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReactionWrite {
    Insert,
    Update,
}

/// Outcome of the transition table: which write to perform on the reaction
/// row and the signed delta for the like counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub write: ReactionWrite,
    pub delta: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Denied {
    AlreadyLiked,
    AlreadyDisliked,
}

/// current state x desired state -> reaction write + counter delta.
/// Dislikes are not counted, so only transitions into or out of LIKED move
/// the counter. Repeating the current state is rejected on both sides.
pub(crate) fn transition(
    current: Option<ReactionState>,
    desired: ReactionState,
) -> Result<Transition, Denied> {
    use ReactionState::{Disliked, Liked};
    match (current, desired) {
        (None, Liked) => Ok(Transition {
            write: ReactionWrite::Insert,
            delta: 1,
        }),
        (None, Disliked) => Ok(Transition {
            write: ReactionWrite::Insert,
            delta: 0,
        }),
        (Some(Disliked), Liked) => Ok(Transition {
            write: ReactionWrite::Update,
            delta: 1,
        }),
        (Some(Liked), Disliked) => Ok(Transition {
            write: ReactionWrite::Update,
            delta: -1,
        }),
        (Some(Liked), Liked) => Err(Denied::AlreadyLiked),
        (Some(Disliked), Disliked) => Err(Denied::AlreadyDisliked),
    }
}

/// Resolve the actor's current reaction to the message and apply the
/// requested one. Returns the message as it stands after the apply.
#[instrument(skip(db))]
pub async fn apply_reaction(
    db: &PgPool,
    actor: Option<i64>,
    message_id: i64,
    desired: ReactionState,
) -> Result<Message, ApiError> {
    if message_id <= 0 {
        return Err(ApiError::validation("invalid parameters"));
    }

    let mut tx = db.begin().await?;

    let message = Message::find_by_id_for_update(&mut tx, message_id)
        .await?
        .ok_or(ApiError::NotFound("message"))?;

    let actor_id = actor.ok_or(ApiError::NotFound("user"))?;
    if !User::exists(&mut tx, actor_id).await? {
        return Err(ApiError::NotFound("user"));
    }

    let current = Reaction::find_for_update(&mut tx, actor_id, message_id)
        .await?
        .map(|r| r.state);

    let step = transition(current, desired).map_err(|denied| match denied {
        Denied::AlreadyLiked => ApiError::conflict("message already liked"),
        Denied::AlreadyDisliked => ApiError::conflict("message already disliked"),
    })?;

    match step.write {
        ReactionWrite::Insert => Reaction::insert(&mut tx, actor_id, message_id, desired).await?,
        ReactionWrite::Update => Reaction::set_state(&mut tx, actor_id, message_id, desired).await?,
    }

    let message = if step.delta != 0 {
        Message::adjust_likes(&mut tx, message_id, step.delta).await?
    } else {
        message
    };

    tx.commit().await?;

    info!(
        user_id = %actor_id,
        %message_id,
        state = ?desired,
        likes = message.likes,
        "reaction applied"
    );
    Ok(message)
}

#[cfg(test)]
mod transition_tests {
    use super::*;
    use ReactionState::{Disliked, Liked};

    #[test]
    fn first_like_inserts_and_increments() {
        let step = transition(None, Liked).unwrap();
        assert_eq!(step.write, ReactionWrite::Insert);
        assert_eq!(step.delta, 1);
    }

    #[test]
    fn first_dislike_inserts_without_touching_the_counter() {
        let step = transition(None, Disliked).unwrap();
        assert_eq!(step.write, ReactionWrite::Insert);
        assert_eq!(step.delta, 0);
    }

    #[test]
    fn switching_dislike_to_like_increments() {
        let step = transition(Some(Disliked), Liked).unwrap();
        assert_eq!(step.write, ReactionWrite::Update);
        assert_eq!(step.delta, 1);
    }

    #[test]
    fn switching_like_to_dislike_decrements() {
        let step = transition(Some(Liked), Disliked).unwrap();
        assert_eq!(step.write, ReactionWrite::Update);
        assert_eq!(step.delta, -1);
    }

    #[test]
    fn repeating_a_like_is_denied() {
        assert_eq!(transition(Some(Liked), Liked), Err(Denied::AlreadyLiked));
    }

    #[test]
    fn repeating_a_dislike_is_denied() {
        assert_eq!(
            transition(Some(Disliked), Disliked),
            Err(Denied::AlreadyDisliked)
        );
    }

    // A like/dislike/like cycle nets out to a single increment.
    #[test]
    fn alternating_reactions_net_to_one() {
        let mut likes = 0;
        likes += transition(None, Liked).unwrap().delta;
        likes += transition(Some(Liked), Disliked).unwrap().delta;
        likes += transition(Some(Disliked), Liked).unwrap().delta;
        assert_eq!(likes, 1);
    }
}
