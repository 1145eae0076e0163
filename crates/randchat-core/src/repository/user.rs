//! User repository trait definition.

use randchat_types::error::RepositoryError;
use randchat_types::invitation::Invitation;
use randchat_types::sex::Sex;
use randchat_types::user::{User, UserId};
use serde::Serialize;

/// Predicate for the waiting-pool query.
///
/// A stored `partner_sex` of `NULL` counts as [`Sex::Unspecified`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingFilter {
    /// Never returned (the seeker itself).
    pub exclude: UserId,
    /// Candidate's own sex must equal this, when set.
    pub sex: Option<Sex>,
    /// Candidate's wanted partner sex must be one of these.
    pub partner_sex_in: Vec<Sex>,
}

impl WaitingFilter {
    /// Build the sex filter for a seeker.
    ///
    /// - The seeker's wanted sex (if specified) must equal the candidate's sex.
    /// - The candidate's wanted sex must be unspecified or equal to the seeker's
    ///   sex. A seeker who has not specified their own sex only matches
    ///   candidates without a preference.
    pub fn for_seeker(seeker: &User) -> Self {
        let wanted = seeker.wanted_sex();
        let own = seeker.own_sex();

        let partner_sex_in = if own.is_specified() {
            vec![own, Sex::Unspecified]
        } else {
            vec![Sex::Unspecified]
        };

        Self {
            exclude: seeker.id,
            sex: wanted.is_specified().then_some(wanted),
            partner_sex_in,
        }
    }

    /// Evaluate the predicate against a live record.
    pub fn matches(&self, candidate: &User) -> bool {
        candidate.id != self.exclude
            && candidate.is_waiting()
            && self.sex.is_none_or(|sex| candidate.own_sex() == sex)
            && self.partner_sex_in.contains(&candidate.wanted_sex())
    }
}

/// Aggregate counts over all stored users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub waiting: u64,
    pub chatting: u64,
    pub full_profiles: u64,
}

/// Repository trait for user persistence.
///
/// Implementations live in randchat-infra (e.g., SqliteUserRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `Conflict` on a duplicate id or invitation.
    fn create(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn get_by_invitation(
        &self,
        invitation: &Invitation,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Waiting users matching `filter`, ordered by bonus count (descending)
    /// then waiting start (ascending).
    fn query_waiting(
        &self,
        filter: &WaitingFilter,
    ) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// Overwrite the stored record. Fails with `NotFound` for unknown ids.
    fn save(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn stats(&self) -> impl std::future::Future<Output = Result<UserStats, RepositoryError>> + Send;
}
