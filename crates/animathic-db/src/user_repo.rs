//! `users` repository. Minimal: the core only needs a durable anchor for
//! the foreign-key-free `user_id` string carried on every other row.

use sqlx::PgPool;

use crate::error::DbResult;

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotently record that `user_id` has been seen.
    pub async fn ensure_user(&self, user_id: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
