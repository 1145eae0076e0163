//! Candidate selection.
//!
//! The matcher reads the waiting pool from storage, re-checks every row
//! against the live record in the directory, drops recent partners and
//! claimed users, ranks what is left and claims the best candidate.

use std::collections::HashSet;
use std::sync::Arc;

use randchat_types::config::GlobalConfig;
use randchat_types::error::PairingError;
use randchat_types::user::{User, UserId};
use tracing::debug;

use crate::directory::{Directory, UserHandle};
use crate::locks::{CandidateGuard, CandidateLocks};
use crate::repository::talk::TalkRepository;
use crate::repository::user::{UserRepository, WaitingFilter};

/// Tunables for candidate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    /// How many of the seeker's latest partners are skipped.
    pub recent_partners_limit: u32,
    /// Fall back to candidates without a shared language.
    pub language_fallback: bool,
}

impl From<&GlobalConfig> for MatchPolicy {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            recent_partners_limit: config.recent_partners_limit,
            language_fallback: config.language_fallback,
        }
    }
}

/// A claimed candidate. The claim is released when this is dropped.
#[derive(Debug)]
pub struct Claim {
    pub handle: Arc<UserHandle>,
    _guard: CandidateGuard,
}

pub struct Matcher<U: UserRepository, T: TalkRepository> {
    directory: Arc<Directory<U>>,
    talks: Arc<T>,
    locks: Arc<CandidateLocks>,
    policy: MatchPolicy,
}

impl<U: UserRepository, T: TalkRepository> Matcher<U, T> {
    pub fn new(
        directory: Arc<Directory<U>>,
        talks: Arc<T>,
        locks: Arc<CandidateLocks>,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            directory,
            talks,
            locks,
            policy,
        }
    }

    /// Select and claim the best waiting candidate for `seeker`.
    pub async fn find_candidate(&self, seeker: &User) -> Result<Claim, PairingError> {
        self.find_candidate_excluding(seeker, &HashSet::new()).await
    }

    /// Like [`Matcher::find_candidate`], never selecting anyone in `skip`.
    pub async fn find_candidate_excluding(
        &self,
        seeker: &User,
        skip: &HashSet<UserId>,
    ) -> Result<Claim, PairingError> {
        let filter = WaitingFilter::for_seeker(seeker);
        let stored = self.directory.repository().query_waiting(&filter).await?;
        let recent: HashSet<UserId> = self
            .talks
            .recent_partner_ids(seeker.id, self.policy.recent_partners_limit)
            .await?
            .into_iter()
            .collect();

        let mut pool = Vec::with_capacity(stored.len());
        for row in stored {
            if recent.contains(&row.id)
                || skip.contains(&row.id)
                || self.locks.is_locked(row.id)
            {
                continue;
            }
            let Some(handle) = self.directory.get(row.id).await? else {
                continue;
            };
            let live = handle.snapshot().await;
            if filter.matches(&live) {
                pool.push((handle, live));
            }
        }

        // Storage order may be stale against live records.
        pool.sort_by(|(_, a), (_, b)| {
            b.bonus_count
                .cmp(&a.bonus_count)
                .then_with(|| a.looking_for_partner_from().cmp(&b.looking_for_partner_from()))
        });

        let pool_size = pool.len();
        for (handle, _) in rank(seeker, pool, self.policy.language_fallback) {
            if let Some(guard) = self.locks.try_acquire(handle.id()) {
                debug!(seeker_id = %seeker.id, candidate_id = %handle.id(), pool_size, "candidate selected");
                return Ok(Claim {
                    handle,
                    _guard: guard,
                });
            }
        }

        debug!(seeker_id = %seeker.id, pool_size, "no candidate found");
        Err(PairingError::NoCandidateFound)
    }
}

/// Order an already sorted pool by language preference.
///
/// Candidates sharing a language come first, by the lowest index of a
/// shared language in the seeker's list; ties keep pool order. Candidates
/// without a shared language follow only when `fallback` is on.
pub fn rank<H>(seeker: &User, pool: Vec<(H, User)>, fallback: bool) -> Vec<(H, User)> {
    let mut keyed: Vec<(usize, (H, User))> = pool
        .into_iter()
        .filter_map(|(handle, user)| {
            match seeker.languages.best_shared_priority(&user.languages) {
                Some(priority) => Some((priority, (handle, user))),
                None if fallback => Some((usize::MAX, (handle, user))),
                None => None,
            }
        })
        .collect();
    keyed.sort_by_key(|(priority, _)| *priority);
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Rig, user_with};
    use chrono::{Duration, Utc};
    use randchat_types::language::Languages;
    use randchat_types::sex::Sex;
    use randchat_types::talk::Talk;
    use randchat_types::user::ChatState;

    fn speaker(id: i64, codes: &[&str]) -> User {
        user_with(id, |u| u.languages = Languages::new(codes).unwrap())
    }

    fn ids(ranked: &[(i64, User)]) -> Vec<i64> {
        ranked.iter().map(|(id, _)| *id).collect()
    }

    #[test]
    fn test_rank_prefers_most_preferred_language() {
        let seeker = speaker(0, &["foo", "bar", "baz"]);
        let pool = vec![
            (1, speaker(1, &["baz"])),
            (2, speaker(2, &["bar", "zen"])),
            (3, speaker(3, &["zen", "foo"])),
            (4, speaker(4, &["foo"])),
        ];
        assert_eq!(ids(&rank(&seeker, pool, true)), vec![3, 4, 2, 1]);
    }

    #[test]
    fn test_rank_fallback_last() {
        let seeker = speaker(0, &["foo"]);
        let pool = vec![(1, speaker(1, &["zen"])), (2, speaker(2, &["foo"]))];
        assert_eq!(ids(&rank(&seeker, pool.clone(), true)), vec![2, 1]);
        assert_eq!(ids(&rank(&seeker, pool, false)), vec![2]);
    }

    fn waiting(id: i64, codes: &[&str], bonus: u32, minutes_ago: i64) -> User {
        user_with(id, |u| {
            u.languages = Languages::new(codes).unwrap();
            u.bonus_count = bonus;
            u.state = ChatState::Waiting {
                since: Utc::now() - Duration::minutes(minutes_ago),
            };
        })
    }

    #[tokio::test]
    async fn test_find_candidate_orders_by_bonus_then_waiting_time() {
        let rig = Rig::new();
        rig.insert(waiting(1, &["en"], 0, 50)).await;
        rig.insert(waiting(2, &["en"], 3, 5)).await;
        rig.insert(waiting(3, &["en"], 3, 10)).await;
        let seeker = waiting(9, &["en"], 0, 0);

        let claim = rig.matcher().find_candidate(&seeker).await.unwrap();
        assert_eq!(claim.handle.id(), UserId(3));
    }

    #[tokio::test]
    async fn test_find_candidate_language_beats_bonus() {
        let rig = Rig::new();
        rig.insert(waiting(1, &["bar"], 10, 50)).await;
        rig.insert(waiting(2, &["foo"], 0, 1)).await;
        let seeker = waiting(9, &["foo", "bar", "baz"], 0, 0);

        let claim = rig.matcher().find_candidate(&seeker).await.unwrap();
        assert_eq!(claim.handle.id(), UserId(2));
    }

    #[tokio::test]
    async fn test_find_candidate_skips_seeker_locked_and_recent() {
        let rig = Rig::new();
        rig.insert(waiting(1, &["en"], 0, 30)).await;
        rig.insert(waiting(2, &["en"], 0, 20)).await;
        rig.insert(waiting(3, &["en"], 0, 10)).await;
        let seeker = rig.insert(waiting(9, &["en"], 5, 40)).await.snapshot().await;
        rig.talks.insert(Talk::new(UserId(9), UserId(1), None));
        let _held = rig.locks.try_acquire(UserId(2)).unwrap();

        let claim = rig.matcher().find_candidate(&seeker).await.unwrap();
        assert_eq!(claim.handle.id(), UserId(3));
        assert!(rig.locks.is_locked(UserId(3)));

        drop(claim);
        assert!(!rig.locks.is_locked(UserId(3)));
    }

    #[tokio::test]
    async fn test_find_candidate_only_latest_partners_excluded() {
        let rig = Rig::new();
        rig.insert(waiting(1, &["en"], 0, 30)).await;
        let seeker = waiting(9, &["en"], 0, 0);
        rig.talks.insert(Talk::new(UserId(9), UserId(1), None));
        for partner in 2..=4 {
            rig.talks.insert(Talk::new(UserId(partner), UserId(9), None));
        }

        let claim = rig.matcher().find_candidate(&seeker).await.unwrap();
        assert_eq!(claim.handle.id(), UserId(1));
    }

    #[tokio::test]
    async fn test_find_candidate_applies_sex_filter() {
        let rig = Rig::new();
        rig.insert(user_with(1, |u| {
            u.languages = Languages::new(["en"]).unwrap();
            u.sex = Some(Sex::Male);
            u.state = ChatState::Waiting { since: Utc::now() };
        }))
        .await;
        let seeker = user_with(9, |u| {
            u.languages = Languages::new(["en"]).unwrap();
            u.sex = Some(Sex::Male);
            u.partner_sex = Some(Sex::Female);
        });

        let err = rig.matcher().find_candidate(&seeker).await.unwrap_err();
        assert!(matches!(err, PairingError::NoCandidateFound));
    }

    #[tokio::test]
    async fn test_find_candidate_uses_live_state() {
        let rig = Rig::new();
        let stale = rig.insert(waiting(1, &["en"], 0, 30)).await;
        rig.lifecycle.directory().update(&stale, |u| {
            u.state = ChatState::Idle;
            Ok(())
        })
        .await
        .unwrap();
        // Storage still lists the user as waiting.
        rig.users.insert(waiting(1, &["en"], 0, 30));

        let seeker = waiting(9, &["en"], 0, 0);
        let err = rig.matcher().find_candidate(&seeker).await.unwrap_err();
        assert!(matches!(err, PairingError::NoCandidateFound));
    }

    #[tokio::test]
    async fn test_find_candidate_empty_pool() {
        let rig = Rig::new();
        let seeker = waiting(9, &["en"], 0, 0);
        let err = rig.matcher().find_candidate(&seeker).await.unwrap_err();
        assert!(matches!(err, PairingError::NoCandidateFound));
    }

    #[tokio::test]
    async fn test_find_candidate_excluding_skips_listed_users() {
        let rig = Rig::new();
        rig.insert(waiting(1, &["en"], 0, 30)).await;
        rig.insert(waiting(2, &["en"], 0, 10)).await;
        let seeker = waiting(9, &["en"], 0, 0);

        let skip = HashSet::from([UserId(1)]);
        let claim = rig
            .matcher()
            .find_candidate_excluding(&seeker, &skip)
            .await
            .unwrap();
        assert_eq!(claim.handle.id(), UserId(2));
    }
}
