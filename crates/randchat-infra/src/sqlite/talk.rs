//! SQLite talk repository implementation.

use chrono::{DateTime, Utc};
use randchat_core::repository::talk::TalkRepository;
use randchat_types::error::RepositoryError;
use randchat_types::talk::Talk;
use randchat_types::user::UserId;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, query_error};

/// SQLite-backed implementation of `TalkRepository`.
pub struct SqliteTalkRepository {
    pool: DatabasePool,
}

impl SqliteTalkRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl TalkRepository for SqliteTalkRepository {
    async fn record_talk(&self, talk: &Talk) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO talks (id, seeker_id, partner_id, searched_since, began_at, ended_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(talk.id.to_string())
        .bind(talk.seeker.0)
        .bind(talk.partner.0)
        .bind(talk.searched_since.as_ref().map(format_datetime))
        .bind(format_datetime(&talk.begin))
        .bind(talk.end.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(())
    }

    async fn finish_talk(&self, user: UserId, end: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE talks SET ended_at = ?
             WHERE ended_at IS NULL AND (seeker_id = ? OR partner_id = ?)",
        )
        .bind(format_datetime(&end))
        .bind(user.0)
        .bind(user.0)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        tracing::debug!(user_id = %user, closed = result.rows_affected(), "talk finished");
        Ok(())
    }

    async fn recent_partner_ids(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<UserId>, RepositoryError> {
        // rowid breaks ties between talks begun within the same instant.
        let rows = sqlx::query(
            "SELECT CASE WHEN seeker_id = ? THEN partner_id ELSE seeker_id END AS other
             FROM talks
             WHERE seeker_id = ? OR partner_id = ?
             ORDER BY began_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(user.0)
        .bind(user.0)
        .bind(user.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("other").map(UserId).map_err(query_error))
            .collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM talks")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
