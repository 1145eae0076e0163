//! Candidate locks.
//!
//! While a pairing attempt is handshaking with a candidate, nobody else may
//! select that candidate. Claiming is an atomic insert into a shared set;
//! the returned guard releases the claim when dropped, so every exit path
//! of a pairing attempt unlocks.

use std::sync::Arc;

use dashmap::DashSet;
use randchat_types::user::UserId;

/// Set of users currently claimed by a pairing attempt.
#[derive(Debug, Default)]
pub struct CandidateLocks {
    held: DashSet<UserId>,
}

impl CandidateLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `user`, or `None` if someone else holds it.
    pub fn try_acquire(self: &Arc<Self>, user: UserId) -> Option<CandidateGuard> {
        self.held.insert(user).then(|| CandidateGuard {
            locks: Arc::clone(self),
            user,
        })
    }

    pub fn is_locked(&self, user: UserId) -> bool {
        self.held.contains(&user)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// A held claim. Dropping it releases the user.
#[derive(Debug)]
pub struct CandidateGuard {
    locks: Arc<CandidateLocks>,
    user: UserId,
}

impl CandidateGuard {
    pub fn user(&self) -> UserId {
        self.user
    }
}

impl Drop for CandidateGuard {
    fn drop(&mut self) {
        self.locks.held.remove(&self.user);
    }
}
