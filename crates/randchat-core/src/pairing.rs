//! Pairing coordinator: turns a selected candidate into an active chat.
//!
//! Per attempt the order is fixed: claim a candidate, notify the candidate,
//! notify the seeker, then link both records. A candidate that cannot be
//! notified, or that leaves the pool mid-handshake, is dropped and the next
//! one is tried; a seeker that cannot be notified ends the search. Claims
//! are scoped guards, released on every exit path.

use std::collections::HashSet;
use std::sync::Arc;

use randchat_types::error::{PairingError, UserError};
use randchat_types::talk::Talk;
use randchat_types::user::UserId;
use tracing::{Instrument, debug, error, field, info, info_span, warn};

use crate::directory::UserHandle;
use crate::lifecycle::Lifecycle;
use crate::locks::CandidateLocks;
use crate::matcher::{MatchPolicy, Matcher};
use crate::repository::talk::TalkRepository;
use crate::repository::user::UserRepository;
use crate::transport::ChatTransport;

pub struct PairingCoordinator<U: UserRepository, T: TalkRepository, C: ChatTransport> {
    lifecycle: Arc<Lifecycle<U, T, C>>,
    matcher: Matcher<U, T>,
    locks: Arc<CandidateLocks>,
}

impl<U: UserRepository, T: TalkRepository, C: ChatTransport> PairingCoordinator<U, T, C> {
    pub fn new(lifecycle: Arc<Lifecycle<U, T, C>>, locks: Arc<CandidateLocks>) -> Self {
        let matcher = Matcher::new(
            lifecycle.directory().clone(),
            lifecycle.talks().clone(),
            locks.clone(),
            MatchPolicy::from(lifecycle.config()),
        );
        Self {
            lifecycle,
            matcher,
            locks,
        }
    }

    /// Find a partner for `seeker` and link the two.
    ///
    /// Returns the new partner. On `NoCandidateFound` and
    /// `SeekerUnreachable` the seeker's record is left untouched.
    pub async fn pair(&self, seeker: &UserHandle) -> Result<Arc<UserHandle>, PairingError> {
        let span = info_span!(
            "pairing.pair",
            pairing.seeker_id = %seeker.id(),
            pairing.attempts = field::Empty,
            pairing.partner_id = field::Empty,
        );
        self.pair_in_span(seeker).instrument(span).await
    }

    async fn pair_in_span(&self, seeker: &UserHandle) -> Result<Arc<UserHandle>, PairingError> {
        // Keeps other seekers from selecting this user mid-search.
        let Some(_seeker_claim) = self.locks.try_acquire(seeker.id()) else {
            debug!(seeker_id = %seeker.id(), "seeker is being paired elsewhere");
            return Err(PairingError::NoCandidateFound);
        };

        // Candidates dropped by this call are never selected again in it.
        let mut discarded: HashSet<UserId> = HashSet::new();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            tracing::Span::current().record("pairing.attempts", attempts);

            let seeker_record = seeker.snapshot().await;
            let claim = self
                .matcher
                .find_candidate_excluding(&seeker_record, &discarded)
                .await?;
            let candidate = claim.handle.clone();

            let candidate_record = candidate.snapshot().await;
            if !candidate_record.is_waiting() {
                info!(candidate_id = %candidate.id(), "candidate stopped waiting before handshake");
                discarded.insert(candidate.id());
                continue;
            }

            if let Err(e) = self
                .lifecycle
                .notify_partner_found(&candidate_record, &seeker_record)
                .await
            {
                info!(candidate_id = %candidate.id(), error = %e, "candidate unreachable, dropping from pool");
                discarded.insert(candidate.id());
                match self.lifecycle.end_chat(&candidate).await {
                    Ok(()) => {}
                    Err(UserError::Unreachable(reason)) => {
                        debug!(candidate_id = %candidate.id(), %reason, "dropped candidate not notified");
                    }
                    Err(e) => {
                        error!(candidate_id = %candidate.id(), error = %e, "failed to drop candidate");
                        return Err(PairingError::StorageError(e.to_string()));
                    }
                }
                continue;
            }

            if !candidate.snapshot().await.is_waiting() {
                info!(candidate_id = %candidate.id(), "candidate stopped waiting during handshake");
                discarded.insert(candidate.id());
                continue;
            }

            if let Err(e) = self
                .lifecycle
                .notify_partner_found(&seeker_record, &candidate_record)
                .await
            {
                warn!(seeker_id = %seeker.id(), error = %e, "seeker unreachable, pairing aborted");
                return Err(PairingError::SeekerUnreachable(e.to_string()));
            }

            let linked = self
                .lifecycle
                .set_partner_if_waiting(&candidate, seeker.id())
                .await
                .map_err(|e| PairingError::StorageError(e.to_string()))?;
            if linked.is_none() {
                info!(candidate_id = %candidate.id(), "candidate left the pool before linking");
                discarded.insert(candidate.id());
                continue;
            }
            if let Err(e) = self.lifecycle.set_partner(seeker, candidate.id()).await {
                error!(seeker_id = %seeker.id(), error = %e, "failed to link seeker, releasing candidate");
                self.lifecycle.kick(&candidate, seeker.id()).await;
                return Err(e.into());
            }
            drop(claim);

            let talk = Talk::new(
                seeker.id(),
                candidate.id(),
                seeker_record.looking_for_partner_from(),
            );
            if let Err(e) = self.lifecycle.talks().record_talk(&talk).await {
                error!(talk_id = %talk.id, error = %e, "failed to record talk");
            }

            self.lifecycle.credit_referral(seeker).await;
            self.lifecycle.credit_referral(&candidate).await;

            tracing::Span::current().record("pairing.partner_id", field::display(candidate.id()));
            info!(seeker_id = %seeker.id(), partner_id = %candidate.id(), attempts, "users paired");
            return Ok(candidate);
        }
    }
}
