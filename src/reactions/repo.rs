use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};

/// A user's stored stance on one message. At most one row per
/// (user, message) pair; absence of a row is the neutral state and rows are
/// never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reaction_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    Liked,
    Disliked,
}

#[derive(Debug, Clone, FromRow)]
pub struct Reaction {
    pub user_id: i64,
    pub message_id: i64,
    pub state: ReactionState,
}

impl Reaction {
    pub async fn find_for_update(
        conn: &mut PgConnection,
        user_id: i64,
        message_id: i64,
    ) -> anyhow::Result<Option<Reaction>> {
        let reaction = sqlx::query_as::<_, Reaction>(
            r#"
            SELECT user_id, message_id, state
            FROM reactions
            WHERE user_id = $1 AND message_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(message_id)
        .fetch_optional(conn)
        .await?;
        Ok(reaction)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        user_id: i64,
        message_id: i64,
        state: ReactionState,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reactions (user_id, message_id, state)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(message_id)
        .bind(state)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_state(
        conn: &mut PgConnection,
        user_id: i64,
        message_id: i64,
        state: ReactionState,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reactions
            SET state = $3, updated_at = now()
            WHERE user_id = $1 AND message_id = $2
            "#,
        )
        .bind(user_id)
        .bind(message_id)
        .bind(state)
        .execute(conn)
        .await?;
        Ok(())
    }
}
