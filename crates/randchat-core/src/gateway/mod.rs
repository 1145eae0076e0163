//! Session gateway: the per-user entry point for inbound messages.
//!
//! Commands drive the lifecycle and the pairing coordinator; plain content
//! goes to the active setup step or is relayed to the partner.

pub mod advertising;
pub mod command;
pub mod referral;
pub mod setup;

use std::sync::Arc;

use randchat_types::error::{PairingError, RelayError, UserError};
use randchat_types::message::ChatMessage;
use randchat_types::user::UserId;
use tracing::{debug, error, info, warn};

use crate::directory::UserHandle;
use crate::i18n::text;
use crate::lifecycle::Lifecycle;
use crate::locks::CandidateLocks;
use crate::pairing::PairingCoordinator;
use crate::repository::talk::TalkRepository;
use crate::repository::user::UserRepository;
use crate::transport::ChatTransport;

use self::advertising::Advertiser;
use self::command::{Command, ParsedCommand, parse_command};
use self::setup::SetupFlow;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Gateway<U: UserRepository, T: TalkRepository, C: ChatTransport> {
    lifecycle: Arc<Lifecycle<U, T, C>>,
    coordinator: PairingCoordinator<U, T, C>,
    setup: SetupFlow<U, T, C>,
    advertiser: Advertiser<U, T, C>,
}

impl<U, T, C> Gateway<U, T, C>
where
    U: UserRepository + 'static,
    T: TalkRepository + 'static,
    C: ChatTransport + 'static,
{
    pub fn new(lifecycle: Arc<Lifecycle<U, T, C>>, locks: Arc<CandidateLocks>) -> Self {
        Self {
            coordinator: PairingCoordinator::new(lifecycle.clone(), locks),
            setup: SetupFlow::new(lifecycle.clone()),
            advertiser: Advertiser::new(lifecycle.clone()),
            lifecycle,
        }
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle<U, T, C>> {
        &self.lifecycle
    }

    pub fn advertiser(&self) -> &Advertiser<U, T, C> {
        &self.advertiser
    }

    /// Handle one inbound message from `user_id`.
    ///
    /// Failures other than bad input or an unreachable sender are reported
    /// to the user as an internal error before being returned.
    pub async fn handle(&self, user_id: UserId, message: &ChatMessage) -> Result<(), UserError> {
        let user = self.lifecycle.directory().get_or_create(user_id).await?;
        let result = self.dispatch(&user, message).await;

        match &result {
            Err(UserError::Unreachable(reason)) => {
                debug!(user_id = %user_id, %reason, "sender unreachable");
            }
            Err(e) if !e.is_validation() => {
                error!(user_id = %user_id, error = %e, "failed to handle message");
                if let Err(e) = self.lifecycle.say_to(&user, text::INTERNAL_ERROR, &[]).await {
                    warn!(user_id = %user_id, error = %e, "can't report internal error");
                }
            }
            _ => {}
        }

        result
    }

    async fn dispatch(&self, user: &Arc<UserHandle>, message: &ChatMessage) -> Result<(), UserError> {
        if let ChatMessage::Text { text: body } = message {
            if let Some(parsed) = parse_command(body) {
                self.advertiser.cancel(user.id());
                return match parsed {
                    ParsedCommand::Known(command) => self.run(user, command).await,
                    ParsedCommand::Unknown(name) => {
                        debug!(user_id = %user.id(), command = %name, "unknown command");
                        self.lifecycle.say_to(user, text::UNKNOWN_COMMAND, &[]).await?;
                        Ok(())
                    }
                };
            }

            if user.snapshot().await.wizard.is_active() {
                return self.setup.handle_input(user, body).await;
            }
        }

        self.relay(user, message).await
    }

    async fn run(&self, user: &Arc<UserHandle>, command: Command) -> Result<(), UserError> {
        debug!(user_id = %user.id(), ?command, "command");
        match command {
            Command::Begin => self.begin(user).await,
            Command::End => self.lifecycle.end_chat(user).await,
            Command::Help => self.help(user).await,
            Command::Setup => {
                self.lifecycle.end_chat(user).await?;
                self.setup.start(user).await
            }
            Command::Start(args) => self.start(user, args.as_deref()).await,
        }
    }

    async fn begin(&self, user: &Arc<UserHandle>) -> Result<(), UserError> {
        match self.coordinator.pair(user).await {
            Ok(_) => Ok(()),
            Err(PairingError::NoCandidateFound) => {
                self.lifecycle.begin_waiting(user).await?;
                self.advertiser.schedule(user.clone());
                Ok(())
            }
            Err(PairingError::SeekerUnreachable(reason)) => {
                warn!(user_id = %user.id(), %reason, "seeker unreachable, search dropped");
                Ok(())
            }
            Err(PairingError::StorageError(msg)) => Err(UserError::StorageError(msg)),
        }
    }

    async fn help(&self, user: &UserHandle) -> Result<(), UserError> {
        let contact = self.lifecycle.config().help_contact.clone();
        let id = user.id().to_string();
        self.lifecycle
            .say_to(user, text::HELP, &[&contact, &id, VERSION])
            .await?;
        Ok(())
    }

    async fn start(&self, user: &UserHandle, args: Option<&str>) -> Result<(), UserError> {
        if let Some(args) = args {
            self.apply_referral(user, args).await?;
        }

        let record = user.snapshot().await;
        if record.wizard.is_active() {
            self.setup.prompt(user).await
        } else if record.is_novice() {
            self.setup.start(user).await
        } else {
            self.lifecycle.say(&record, text::MANUAL, &[]).await?;
            Ok(())
        }
    }

    /// Remember who invited `user`. The first inviter sticks.
    async fn apply_referral(&self, user: &UserHandle, args: &str) -> Result<(), UserError> {
        let record = user.snapshot().await;
        if record.invited_by.is_some() {
            return Ok(());
        }

        let Some(token) = referral::decode_start_args(args) else {
            debug!(user_id = %user.id(), "start arguments without invitation");
            return Ok(());
        };
        if token == record.invitation.as_str() {
            self.lifecycle.say(&record, text::SELF_INVITATION, &[]).await?;
            return Ok(());
        }

        let inviter = match self.lifecycle.directory().get_by_invitation(&token).await {
            Ok(inviter) => inviter,
            Err(UserError::NotFound | UserError::InvalidInvitation(_)) => {
                info!(user_id = %user.id(), %token, "unknown invitation");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let inviter_id = inviter.id();
        if inviter.snapshot().await.invited_by == Some(user.id()) {
            error!(user_id = %user.id(), inviter_id = %inviter_id, "referral cycle rejected");
            return Ok(());
        }

        self.lifecycle
            .directory()
            .update(user, |record| {
                if record.invited_by.is_none() {
                    record.invited_by = Some(inviter_id);
                }
                Ok(())
            })
            .await?;
        info!(user_id = %user.id(), inviter_id = %inviter_id, "user joined by invitation");
        Ok(())
    }

    async fn relay(&self, user: &UserHandle, message: &ChatMessage) -> Result<(), UserError> {
        match self.lifecycle.send_to_partner(user, message).await {
            Ok(()) => Ok(()),
            Err(RelayError::MissingPartner) => {
                self.lifecycle.say_to(user, text::NO_PARTNER, &[]).await?;
                Ok(())
            }
            Err(RelayError::PartnerUnreachable(partner)) => {
                info!(user_id = %user.id(), partner_id = %partner, "partner blocked the bot");
                self.lifecycle.say_to(user, text::PARTNER_BLOCKED, &[]).await?;
                self.lifecycle.end_chat(user).await
            }
            Err(RelayError::Unsupported(kind)) => {
                debug!(user_id = %user.id(), %kind, "unsupported content");
                self.lifecycle.say_to(user, text::UNSUPPORTED_CONTENT, &[]).await?;
                Ok(())
            }
            Err(RelayError::Transport(msg)) => {
                error!(user_id = %user.id(), error = %msg, "relay failed");
                Ok(())
            }
        }
    }
}
