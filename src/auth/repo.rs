use crate::auth::repo_types::{Plan, User, UserSummary};
use sqlx::SqlitePool;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, plan, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, plan, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password. The UNIQUE constraint on
    /// `email` decides duplicates; there is no prior lookup.
    pub async fn create(
        db: &SqlitePool,
        name: &str,
        email: &str,
        password_hash: &str,
        plan: Plan,
    ) -> Result<User, CreateUserError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, plan, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, name, email, password_hash, plan, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(plan)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CreateUserError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns false when no user has this id.
    pub async fn set_plan(db: &SqlitePool, id: i64, plan: Plan) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET plan = ?1 WHERE id = ?2")
            .bind(plan)
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn list_summaries(db: &SqlitePool) -> anyhow::Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email, plan, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
