//! User record state machine.
//!
//! Transitions: Idle -> Waiting, Waiting -> Chatting, Chatting -> Idle,
//! Waiting -> Idle. Pairing a Chatting user ends its current chat first.
//!
//! Every transition commits the record (memory and storage) before anyone
//! is notified. Delivery failures towards the user who triggered the
//! operation are returned as `UserError::Unreachable` after the commit;
//! failures towards third parties (a kicked partner, a rewarded inviter) are
//! logged and absorbed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use randchat_types::config::GlobalConfig;
use randchat_types::error::{DeliveryError, RelayError, UserError};
use randchat_types::language::{Languages, LanguagesUpdate};
use randchat_types::message::ChatMessage;
use randchat_types::sex::normalize_sex;
use randchat_types::user::{ChatState, User, UserId};
use tracing::{debug, error, warn};

use crate::directory::{Directory, UserHandle};
use crate::i18n::{Localizer, fill, text};
use crate::repository::talk::TalkRepository;
use crate::repository::user::UserRepository;
use crate::transport::ChatTransport;

/// What a `set_partner` call changed on one side of a new pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartnerLink {
    pub previous_partner: Option<UserId>,
    pub was_waiting: bool,
    pub used_bonus: bool,
}

/// Operations on single user records.
pub struct Lifecycle<U: UserRepository, T: TalkRepository, C: ChatTransport> {
    directory: Arc<Directory<U>>,
    talks: Arc<T>,
    transport: Arc<C>,
    localizer: Arc<dyn Localizer>,
    config: Arc<GlobalConfig>,
}

impl<U: UserRepository, T: TalkRepository, C: ChatTransport> Lifecycle<U, T, C> {
    pub fn new(
        directory: Arc<Directory<U>>,
        talks: Arc<T>,
        transport: Arc<C>,
        localizer: Arc<dyn Localizer>,
        config: Arc<GlobalConfig>,
    ) -> Self {
        Self {
            directory,
            talks,
            transport,
            localizer,
            config,
        }
    }

    pub fn directory(&self) -> &Arc<Directory<U>> {
        &self.directory
    }

    pub fn talks(&self) -> &Arc<T> {
        &self.talks
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn localizer(&self) -> &dyn Localizer {
        self.localizer.as_ref()
    }

    /// Render a template in the user's locale and send it.
    pub async fn say(&self, user: &User, template: &str, args: &[&str]) -> Result<(), DeliveryError> {
        let text = fill(&self.localizer.translate(user.locale(), template), args);
        self.transport.notify(user.id, &text).await
    }

    /// Like [`Lifecycle::say`], reading the user's current record.
    pub async fn say_to(
        &self,
        user: &UserHandle,
        template: &str,
        args: &[&str],
    ) -> Result<(), DeliveryError> {
        let snapshot = user.snapshot().await;
        self.say(&snapshot, template, args).await
    }

    /// Enter the waiting pool, ending the current chat if there is one.
    ///
    /// A user who is already waiting keeps their original waiting start.
    pub async fn begin_waiting(&self, user: &UserHandle) -> Result<(), UserError> {
        let now = Utc::now();
        let previous = self
            .directory
            .update(user, |record| {
                let previous = record.state;
                record.state = match previous {
                    ChatState::Waiting { since } => ChatState::Waiting { since },
                    _ => ChatState::Waiting { since: now },
                };
                Ok(previous)
            })
            .await?;
        debug!(user_id = %user.id(), from = %previous, "user is waiting");

        if let ChatState::Chatting { partner } = previous {
            self.close_talk(user.id()).await;
            self.kick_by_id(partner, user.id()).await;
        }

        self.say_to(user, text::LOOKING_FOR_PARTNER, &[]).await?;
        Ok(())
    }

    /// Leave the current chat or the waiting pool. No-op when idle.
    pub async fn end_chat(&self, user: &UserHandle) -> Result<(), UserError> {
        let previous = self
            .directory
            .update(user, |record| {
                let previous = record.state;
                record.state = ChatState::Idle;
                Ok(previous)
            })
            .await?;

        match previous {
            ChatState::Idle => {}
            ChatState::Waiting { .. } => {
                debug!(user_id = %user.id(), "user stopped waiting");
                self.say_to(user, text::SEARCH_STOPPED, &[]).await?;
            }
            ChatState::Chatting { partner } => {
                debug!(user_id = %user.id(), partner_id = %partner, "user ended chat");
                self.close_talk(user.id()).await;
                self.kick_by_id(partner, user.id()).await;
                self.say_to(user, text::CHAT_FINISHED, &[]).await?;
            }
        }

        Ok(())
    }

    /// Release `user` from their chat with `by`.
    ///
    /// Does nothing if `user` is no longer linked to `by`, which happens when
    /// they were paired with someone else in the meantime.
    pub async fn kick(&self, user: &UserHandle, by: UserId) {
        let released = self
            .directory
            .update(user, |record| {
                if record.partner() == Some(by) {
                    record.state = ChatState::Idle;
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
            .await;

        match released {
            Ok(true) => {
                debug!(user_id = %user.id(), by = %by, "user kicked");
                if let Err(e) = self.say_to(user, text::PARTNER_LEFT, &[]).await {
                    warn!(user_id = %user.id(), error = %e, "Kick. Can't notify");
                }
            }
            Ok(false) => {
                debug!(user_id = %user.id(), by = %by, "kick skipped, user has moved on");
            }
            Err(e) => {
                error!(user_id = %user.id(), error = %e, "failed to release kicked user");
            }
        }
    }

    async fn kick_by_id(&self, user: UserId, by: UserId) {
        match self.directory.get(user).await {
            Ok(Some(handle)) => self.kick(&handle, by).await,
            Ok(None) => warn!(user_id = %user, "kicked user not found"),
            Err(e) => error!(user_id = %user, error = %e, "failed to load kicked user"),
        }
    }

    async fn close_talk(&self, user: UserId) {
        if let Err(e) = self.talks.finish_talk(user, Utc::now()).await {
            error!(user_id = %user, error = %e, "failed to close talk");
        }
    }

    /// Link `user` to `partner`. Only the pairing coordinator calls this.
    ///
    /// Ends any other chat first. Consumes one bonus if the user was waiting
    /// and has any.
    pub async fn set_partner(
        &self,
        user: &UserHandle,
        partner: UserId,
    ) -> Result<PartnerLink, UserError> {
        // Unconditional links always apply.
        Ok(self.link(user, partner, false).await?.unwrap_or_default())
    }

    /// Link a candidate to `partner` only if the candidate is still waiting.
    ///
    /// Returns `None`, leaving the record alone, when the candidate left the
    /// pool since it was selected.
    pub async fn set_partner_if_waiting(
        &self,
        user: &UserHandle,
        partner: UserId,
    ) -> Result<Option<PartnerLink>, UserError> {
        self.link(user, partner, true).await
    }

    async fn link(
        &self,
        user: &UserHandle,
        partner: UserId,
        require_waiting: bool,
    ) -> Result<Option<PartnerLink>, UserError> {
        let link = self
            .directory
            .update(user, |record| {
                let was_waiting = record.is_waiting();
                if require_waiting && !was_waiting {
                    return Ok(None);
                }
                let used_bonus = was_waiting && record.bonus_count > 0;
                let link = PartnerLink {
                    previous_partner: record.partner(),
                    was_waiting,
                    used_bonus,
                };
                if used_bonus {
                    record.bonus_count -= 1;
                }
                record.state = ChatState::Chatting { partner };
                Ok(Some(link))
            })
            .await?;
        let Some(link) = link else {
            debug!(user_id = %user.id(), partner_id = %partner, "user left the pool, not linked");
            return Ok(None);
        };
        debug!(user_id = %user.id(), partner_id = %partner, used_bonus = link.used_bonus, "partner set");

        if let Some(old) = link.previous_partner.filter(|old| *old != partner) {
            self.close_talk(user.id()).await;
            self.kick_by_id(old, user.id()).await;
        }

        Ok(Some(link))
    }

    /// Replace or keep the user's languages.
    pub async fn set_languages(
        &self,
        user: &UserHandle,
        update: LanguagesUpdate,
    ) -> Result<(), UserError> {
        let replacement = match update {
            LanguagesUpdate::Keep => None,
            LanguagesUpdate::Replace(codes) => Some(Languages::new(codes)?),
        };

        self.directory
            .update(user, move |record| match replacement {
                Some(languages) => {
                    record.languages = languages;
                    Ok(())
                }
                None if record.languages.is_empty() => Err(UserError::EmptyLanguages),
                None => Ok(()),
            })
            .await
    }

    /// Set the user's own sex from free text.
    pub async fn set_sex(&self, user: &UserHandle, input: &str) -> Result<(), UserError> {
        let sex = normalize_sex(input, &self.localizer.all_sex_synonyms())
            .into_sex()
            .ok_or_else(|| UserError::InvalidSex(input.trim().to_string()))?;
        self.directory
            .update(user, |record| {
                record.sex = Some(sex);
                Ok(())
            })
            .await
    }

    /// Set the wanted partner sex from free text.
    pub async fn set_partner_sex(&self, user: &UserHandle, input: &str) -> Result<(), UserError> {
        let sex = normalize_sex(input, &self.localizer.all_sex_synonyms())
            .into_sex()
            .ok_or_else(|| UserError::InvalidSex(input.trim().to_string()))?;
        self.directory
            .update(user, |record| {
                record.partner_sex = Some(sex);
                Ok(())
            })
            .await
    }

    /// Grant one bonus and tell the user about it.
    pub async fn add_bonus(&self, user: &UserHandle) -> Result<(), UserError> {
        let total = self
            .directory
            .update(user, |record| {
                record.bonus_count = record.bonus_count.saturating_add(1);
                Ok(record.bonus_count)
            })
            .await?;

        let total = total.to_string();
        if let Err(e) = self.say_to(user, text::BONUS_RECEIVED, &[&total]).await {
            warn!(user_id = %user.id(), error = %e, "can't notify user about received bonus");
        }
        Ok(())
    }

    /// Reward the inviter of `user` once, on their first pairing.
    pub async fn credit_referral(&self, user: &UserHandle) {
        let newly_credited = self
            .directory
            .update(user, |record| {
                if record.invited_by.is_some() && !record.referral_credited {
                    record.referral_credited = true;
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
            .await;

        match newly_credited {
            Ok(true) => match self.directory.referrer(user).await {
                Ok(Some(inviter)) => {
                    if let Err(e) = self.add_bonus(&inviter).await {
                        error!(user_id = %user.id(), inviter_id = %inviter.id(), error = %e, "failed to credit inviter");
                    }
                }
                Ok(None) => {}
                Err(e) => error!(user_id = %user.id(), error = %e, "failed to resolve inviter"),
            },
            Ok(false) => {}
            Err(e) => error!(user_id = %user.id(), error = %e, "failed to mark referral as credited"),
        }
    }

    /// Forward a message to the user's current partner.
    pub async fn send_to_partner(
        &self,
        user: &UserHandle,
        message: &ChatMessage,
    ) -> Result<(), RelayError> {
        let Some(partner) = user.snapshot().await.partner() else {
            return Err(RelayError::MissingPartner);
        };

        self.transport
            .relay(partner, message)
            .await
            .map_err(|e| match e {
                DeliveryError::Unreachable(_) => RelayError::PartnerUnreachable(partner),
                DeliveryError::Unsupported(kind) => RelayError::Unsupported(kind),
                DeliveryError::Transport(msg) => RelayError::Transport(msg),
            })
    }

    /// Tell `user` that `partner` was found for them.
    pub async fn notify_partner_found(
        &self,
        user: &User,
        partner: &User,
    ) -> Result<(), DeliveryError> {
        let text = self.partner_found_text(user, partner, Utc::now());
        self.transport.notify(user.id, &text).await
    }

    /// Build the "partner found" message for `user`.
    ///
    /// A header, then optional clauses about bonus use, shared languages and
    /// how long the partner has waited. Without any clause the message wishes
    /// a nice chat instead.
    pub fn partner_found_text(&self, user: &User, partner: &User, now: DateTime<Utc>) -> String {
        let locale = user.locale();
        let header = if user.is_chatting() {
            text::ANOTHER_PARTNER_FOUND
        } else {
            text::PARTNER_FOUND
        };
        let mut clauses = vec![self.localizer.translate(locale, header)];

        if user.is_waiting() && user.bonus_count > 0 {
            let left = user.bonus_count - 1;
            let clause = if left == 0 {
                self.localizer.translate(locale, text::LAST_BONUS_USED)
            } else {
                fill(
                    &self.localizer.translate(locale, text::BONUS_USED),
                    &[&left.to_string()],
                )
            };
            clauses.push(clause);
        }

        let common = user.common_languages(partner);
        if !common.is_empty() && common.as_slice() != user.languages.as_slice() {
            // Rendered in a language both partners understand.
            let shared_locale = common[0].as_str();
            let names = self.localizer.language_names(shared_locale, &common).join(", ");
            let template = if common.len() == 1 {
                text::USE_LANGUAGE
            } else {
                text::USE_LANGUAGES
            };
            clauses.push(fill(
                &self.localizer.translate(shared_locale, template),
                &[&names],
            ));
        }

        if let Some(since) = partner.looking_for_partner_from() {
            let minutes = (now - since).num_minutes();
            if minutes >= self.config.long_waiting_minutes {
                let duration = if minutes < 60 {
                    fill(
                        &self.localizer.translate(locale, text::MINUTES),
                        &[&minutes.to_string()],
                    )
                } else {
                    fill(
                        &self.localizer.translate(locale, text::HOURS),
                        &[&(minutes / 60).to_string()],
                    )
                };
                clauses.push(fill(
                    &self.localizer.translate(locale, text::PARTNER_WAITED),
                    &[&duration],
                ));
            }
        }

        if clauses.len() == 1 {
            clauses.push(self.localizer.translate(locale, text::NICE_CHAT));
        }

        clauses.join(" ")
    }
}
