use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use tracing::{debug, warn};

/// One message/reply exchange. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatRecord {
    pub id: i64,
    pub user_id: i64,
    pub user_message: String,
    pub bot_reply: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ChatRecord {
    pub async fn insert(
        db: &SqlitePool,
        user_id: i64,
        user_message: &str,
        bot_reply: &str,
    ) -> anyhow::Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO chats (user_id, user_message, bot_reply, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(user_message)
        .bind(bot_reply)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await?;
        Ok(id)
    }

    pub async fn list_by_user(db: &SqlitePool, user_id: i64) -> anyhow::Result<Vec<ChatRecord>> {
        let rows = sqlx::query_as::<_, ChatRecord>(
            r#"
            SELECT id, user_id, user_message, bot_reply, created_at
            FROM chats
            WHERE user_id = ?1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// History recorder. Store failures are logged and swallowed so the reply
/// still reaches the caller.
pub async fn record(db: &SqlitePool, user_id: i64, user_message: &str, bot_reply: &str) {
    match ChatRecord::insert(db, user_id, user_message, bot_reply).await {
        Ok(id) => debug!(chat_id = id, user_id, "chat recorded"),
        Err(e) => warn!(error = %e, user_id, "failed to record chat"),
    }
}
