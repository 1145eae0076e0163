//! Deferred advertising for users left waiting.
//!
//! When a search finds nobody, a timer is armed for the user. If they are
//! still waiting when it fires and somebody else is waiting too, they get
//! a nudge to relax their filters and their shareable invite text. Any
//! later command from the user disarms the timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use randchat_types::user::UserId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::directory::UserHandle;
use crate::gateway::referral;
use crate::i18n::text;
use crate::lifecycle::Lifecycle;
use crate::repository::talk::TalkRepository;
use crate::repository::user::UserRepository;
use crate::transport::ChatTransport;

/// An armed timer. The ticket tells a timer apart from its replacement.
struct Pending {
    ticket: u64,
    token: CancellationToken,
}

pub struct Advertiser<U: UserRepository, T: TalkRepository, C: ChatTransport> {
    lifecycle: Arc<Lifecycle<U, T, C>>,
    pending: Arc<DashMap<UserId, Pending>>,
    next_ticket: AtomicU64,
    delay: Duration,
}

impl<U, T, C> Advertiser<U, T, C>
where
    U: UserRepository + 'static,
    T: TalkRepository + 'static,
    C: ChatTransport + 'static,
{
    pub fn new(lifecycle: Arc<Lifecycle<U, T, C>>) -> Self {
        let delay = Duration::from_secs(lifecycle.config().advertising_delay_secs);
        Self {
            lifecycle,
            pending: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(0),
            delay,
        }
    }

    /// Arm (or re-arm) the timer for `user`.
    pub fn schedule(&self, user: Arc<UserHandle>) {
        let user_id = user.id();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let replaced = self.pending.insert(
            user_id,
            Pending {
                ticket,
                token: token.clone(),
            },
        );
        if let Some(previous) = replaced {
            previous.token.cancel();
        }

        let lifecycle = self.lifecycle.clone();
        let pending = self.pending.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(user_id = %user_id, "advertising cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    pending.remove_if(&user_id, |_, p| p.ticket == ticket);
                    advertise(&lifecycle, &user).await;
                }
            }
        });
    }

    /// Disarm the timer for `user`, if any.
    pub fn cancel(&self, user: UserId) {
        if let Some((_, pending)) = self.pending.remove(&user) {
            pending.token.cancel();
        }
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

async fn advertise<U, T, C>(lifecycle: &Lifecycle<U, T, C>, user: &UserHandle)
where
    U: UserRepository,
    T: TalkRepository,
    C: ChatTransport,
{
    let record = user.snapshot().await;
    if !record.is_waiting() {
        return;
    }

    let waiting = match lifecycle.directory().repository().stats().await {
        Ok(stats) => stats.waiting,
        Err(e) => {
            error!(user_id = %record.id, error = %e, "can't count waiting users");
            return;
        }
    };
    // The count includes the user.
    if waiting <= 1 {
        return;
    }

    let count = waiting.to_string();
    if let Err(e) = lifecycle.say(&record, text::STILL_SEARCHING, &[&count]).await {
        warn!(user_id = %record.id, error = %e, "can't advertise");
        return;
    }
    let link = referral::invite_link(lifecycle.config(), &record.invitation);
    if let Err(e) = lifecycle.say(&record, text::SHARE, &[&link]).await {
        warn!(user_id = %record.id, error = %e, "can't send share text");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::fill;
    use crate::testing::{Rig, user_with};
    use chrono::Utc;
    use randchat_types::user::ChatState;

    fn waiting(id: i64) -> randchat_types::user::User {
        user_with(id, |u| u.state = ChatState::Waiting { since: Utc::now() })
    }

    #[tokio::test(start_paused = true)]
    async fn test_advertises_after_delay() {
        let rig = Rig::new();
        let user = rig.insert(waiting(1)).await;
        rig.insert(waiting(2)).await;
        let advertiser = Advertiser::new(rig.lifecycle.clone());

        advertiser.schedule(user.clone());
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rig.transport.notes_for(UserId(1)).is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let notes = rig.transport.notes_for(UserId(1));
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0], fill(text::STILL_SEARCHING, &["2"]));
        assert!(notes[1].contains("telegram.me/RandTalkBot?start="));
        assert_eq!(advertiser.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_advertising() {
        let rig = Rig::new();
        let user = rig.insert(waiting(1)).await;
        rig.insert(waiting(2)).await;
        let advertiser = Advertiser::new(rig.lifecycle.clone());

        advertiser.schedule(user);
        advertiser.cancel(UserId(1));
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(rig.transport.notes_for(UserId(1)).is_empty());
        assert_eq!(advertiser.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alone_in_pool_gets_nothing() {
        let rig = Rig::new();
        let user = rig.insert(waiting(1)).await;
        let advertiser = Advertiser::new(rig.lifecycle.clone());

        advertiser.schedule(user);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(rig.transport.notes_for(UserId(1)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_timer() {
        let rig = Rig::new();
        let user = rig.insert(waiting(1)).await;
        rig.insert(waiting(2)).await;
        let advertiser = Advertiser::new(rig.lifecycle.clone());

        advertiser.schedule(user.clone());
        tokio::time::sleep(Duration::from_secs(20)).await;
        advertiser.schedule(user);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rig.transport.notes_for(UserId(1)).is_empty());
        assert_eq!(advertiser.pending(), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(rig.transport.notes_for(UserId(1)).len(), 2);
    }
}
