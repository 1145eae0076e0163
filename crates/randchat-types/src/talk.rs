//! Talk history types.
//!
//! A talk is one pairing of two users, from the moment they were matched
//! until either side ended it. Recent talks feed the repeat-partner filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// One recorded pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talk {
    pub id: Uuid,
    /// The user whose search produced this pairing.
    pub seeker: UserId,
    pub partner: UserId,
    /// When the seeker started waiting, if they were waiting.
    pub searched_since: Option<DateTime<Utc>>,
    pub begin: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Talk {
    pub fn new(seeker: UserId, partner: UserId, searched_since: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::now_v7(),
            seeker,
            partner,
            searched_since,
            begin: Utc::now(),
            end: None,
        }
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.seeker == user || self.partner == user
    }

    /// The other participant, or `None` if `user` did not take part.
    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        if self.seeker == user {
            Some(self.partner)
        } else if self.partner == user {
            Some(self.seeker)
        } else {
            None
        }
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }
}
