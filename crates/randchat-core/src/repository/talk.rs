//! Talk history repository trait definition.

use chrono::{DateTime, Utc};
use randchat_types::error::RepositoryError;
use randchat_types::talk::Talk;
use randchat_types::user::UserId;

/// Repository trait for the pairing history.
///
/// Implementations live in randchat-infra (e.g., SqliteTalkRepository).
pub trait TalkRepository: Send + Sync {
    /// Record a new, open talk.
    fn record_talk(
        &self,
        talk: &Talk,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Close every open talk `user` takes part in.
    fn finish_talk(
        &self,
        user: UserId,
        end: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Partners of `user` in their most recent talks, newest first.
    fn recent_partner_ids(
        &self,
        user: UserId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<UserId>, RepositoryError>> + Send;

    /// Total number of recorded talks.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
