use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;

use super::dto::ListOptions;

const MESSAGE_COLUMNS: &str =
    "id, user_id, title, content, attachment, likes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub attachment: Option<String>,
    pub likes: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A message joined with its owner's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MessageWithAuthor {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub attachment: Option<String>,
    pub likes: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub username: String,
}

impl Message {
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        title: &str,
        content: &str,
        attachment: Option<&str>,
    ) -> anyhow::Result<Message> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (user_id, title, content, attachment, likes)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(attachment)
        .fetch_one(db)
        .await?;
        Ok(message)
    }

    /// Load a message and take its row lock. Concurrent reaction appliers on
    /// the same message serialize on this lock.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: i64,
    ) -> anyhow::Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(message)
    }

    /// Apply a signed delta to the denormalized like counter. The only write
    /// path for `messages.likes`; called at most once per reaction apply.
    pub async fn adjust_likes(
        conn: &mut PgConnection,
        id: i64,
        delta: i32,
    ) -> anyhow::Result<Message> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            UPDATE messages
            SET likes = likes + $2, updated_at = now()
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(delta)
        .fetch_one(conn)
        .await?;
        Ok(message)
    }

    pub async fn list(db: &PgPool, opts: &ListOptions) -> anyhow::Result<Vec<MessageWithAuthor>> {
        // order_field comes from the column allowlist, never raw client input
        let sql = format!(
            "SELECT m.id, m.user_id, m.title, m.content, m.attachment, m.likes, \
                    m.created_at, m.updated_at, u.username \
             FROM messages m \
             JOIN users u ON u.id = m.user_id \
             ORDER BY m.{} {} \
             LIMIT $1 OFFSET $2",
            opts.order_field,
            opts.order_dir.as_sql()
        );
        let rows = sqlx::query_as::<_, MessageWithAuthor>(&sql)
            .bind(opts.limit)
            .bind(opts.offset)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }
}
