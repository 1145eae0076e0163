//! SQLite user repository implementation.
//!
//! Implements `UserRepository` from `randchat-core`. The chat state is spread
//! over two nullable columns: `partner_id` (chatting) and
//! `looking_for_partner_from` (waiting).

use randchat_core::repository::user::{UserRepository, UserStats, WaitingFilter};
use randchat_types::error::RepositoryError;
use randchat_types::invitation::Invitation;
use randchat_types::language::{DEFAULT_LOCALE, Languages};
use randchat_types::sex::Sex;
use randchat_types::user::{ChatState, User, UserId, Wizard};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `UserRepository`.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct UserRow {
    id: i64,
    invitation: String,
    invited_by: Option<i64>,
    referral_credited: bool,
    bonus_count: i64,
    languages: String,
    sex: Option<String>,
    partner_sex: Option<String>,
    partner_id: Option<i64>,
    looking_for_partner_from: Option<String>,
    wizard: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            invitation: row.try_get("invitation")?,
            invited_by: row.try_get("invited_by")?,
            referral_credited: row.try_get("referral_credited")?,
            bonus_count: row.try_get("bonus_count")?,
            languages: row.try_get("languages")?,
            sex: row.try_get("sex")?,
            partner_sex: row.try_get("partner_sex")?,
            partner_id: row.try_get("partner_id")?,
            looking_for_partner_from: row.try_get("looking_for_partner_from")?,
            wizard: row.try_get("wizard")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let id = UserId(self.id);
        let invitation = Invitation::parse(&self.invitation)
            .map_err(|e| RepositoryError::Query(format!("user {id}: {e}")))?;

        let languages = match serde_json::from_str::<Vec<String>>(&self.languages) {
            Ok(codes) => Languages::from_stored(codes),
            Err(e) => {
                tracing::warn!(user_id = %id, error = %e, "corrupted languages, falling back to default");
                Languages::from_stored(vec![DEFAULT_LOCALE.to_string()])
            }
        };

        let sex = parse_sex(self.sex.as_deref())?;
        let partner_sex = parse_sex(self.partner_sex.as_deref())?;
        let wizard: Wizard = self.wizard.parse().map_err(RepositoryError::Query)?;
        let since = self
            .looking_for_partner_from
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(User {
            id,
            invitation,
            invited_by: self.invited_by.map(UserId),
            referral_credited: self.referral_credited,
            bonus_count: u32::try_from(self.bonus_count).unwrap_or(0),
            languages,
            sex,
            partner_sex,
            state: ChatState::from_columns(self.partner_id.map(UserId), since),
            wizard,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn parse_sex(value: Option<&str>) -> Result<Option<Sex>, RepositoryError> {
    value
        .map(|s| s.parse::<Sex>().map_err(RepositoryError::Query))
        .transpose()
}

fn languages_json(user: &User) -> Result<String, RepositoryError> {
    serde_json::to_string(user.languages.as_slice()).map_err(|e| RepositoryError::Query(e.to_string()))
}

fn rows_to_users(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<User>, RepositoryError> {
    rows.iter()
        .map(|row| UserRow::from_row(row).map_err(query_error)?.into_user())
        .collect()
}

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let languages = languages_json(user)?;

        let result = sqlx::query(
            "INSERT INTO users (id, invitation, invited_by, referral_credited, bonus_count, languages, sex, partner_sex, partner_id, looking_for_partner_from, wizard, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.0)
        .bind(user.invitation.as_str())
        .bind(user.invited_by.map(|u| u.0))
        .bind(user.referral_credited)
        .bind(i64::from(user.bonus_count))
        .bind(&languages)
        .bind(user.sex.map(|s| s.to_string()))
        .bind(user.partner_sex.map(|s| s.to_string()))
        .bind(user.partner().map(|u| u.0))
        .bind(user.looking_for_partner_from().as_ref().map(format_datetime))
        .bind(user.wizard.to_string())
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(user.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("user {}: {}", user.id, db_err.message())),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(UserRow::from_row(&row).map_err(query_error)?.into_user()?)),
            None => Ok(None),
        }
    }

    async fn get_by_invitation(
        &self,
        invitation: &Invitation,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE invitation = ?")
            .bind(invitation.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(UserRow::from_row(&row).map_err(query_error)?.into_user()?)),
            None => Ok(None),
        }
    }

    async fn query_waiting(&self, filter: &WaitingFilter) -> Result<Vec<User>, RepositoryError> {
        let mut sql = String::from(
            "SELECT * FROM users
             WHERE looking_for_partner_from IS NOT NULL AND partner_id IS NULL AND id != ?",
        );
        if filter.sex.is_some() {
            sql.push_str(" AND COALESCE(sex, 'not_specified') = ?");
        }
        if !filter.partner_sex_in.is_empty() {
            let placeholders = vec!["?"; filter.partner_sex_in.len()].join(", ");
            sql.push_str(&format!(
                " AND COALESCE(partner_sex, 'not_specified') IN ({placeholders})"
            ));
        }
        sql.push_str(" ORDER BY bonus_count DESC, looking_for_partner_from ASC");

        let mut query = sqlx::query(&sql).bind(filter.exclude.0);
        if let Some(sex) = filter.sex {
            query = query.bind(sex.to_string());
        }
        for sex in &filter.partner_sex_in {
            query = query.bind(sex.to_string());
        }

        let rows = query.fetch_all(&self.pool.reader).await.map_err(query_error)?;
        rows_to_users(&rows)
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        let languages = languages_json(user)?;

        let result = sqlx::query(
            "UPDATE users SET invited_by = ?, referral_credited = ?, bonus_count = ?, languages = ?, sex = ?, partner_sex = ?, partner_id = ?, looking_for_partner_from = ?, wizard = ?
             WHERE id = ?",
        )
        .bind(user.invited_by.map(|u| u.0))
        .bind(user.referral_credited)
        .bind(i64::from(user.bonus_count))
        .bind(&languages)
        .bind(user.sex.map(|s| s.to_string()))
        .bind(user.partner_sex.map(|s| s.to_string()))
        .bind(user.partner().map(|u| u.0))
        .bind(user.looking_for_partner_from().as_ref().map(format_datetime))
        .bind(user.wizard.to_string())
        .bind(user.id.0)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<UserStats, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(CASE WHEN looking_for_partner_from IS NOT NULL AND partner_id IS NULL THEN 1 ELSE 0 END), 0) AS waiting,
                    COALESCE(SUM(CASE WHEN partner_id IS NOT NULL THEN 1 ELSE 0 END), 0) AS chatting,
                    COALESCE(SUM(CASE WHEN languages != '[]' AND sex IS NOT NULL AND partner_sex IS NOT NULL THEN 1 ELSE 0 END), 0) AS full_profiles
             FROM users",
        )
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let count = |column: &str| -> Result<u64, RepositoryError> {
            let value: i64 = row.try_get(column).map_err(query_error)?;
            Ok(u64::try_from(value).unwrap_or(0))
        };

        Ok(UserStats {
            total: count("total")?,
            waiting: count("waiting")?,
            chatting: count("chatting")?,
            full_profiles: count("full_profiles")?,
        })
    }
}
