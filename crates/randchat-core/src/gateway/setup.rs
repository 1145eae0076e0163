//! Three-step preference setup: languages, own sex, partner sex.
//!
//! While a step is active, the user's plain text goes here instead of to
//! their partner. Bad answers are explained and the same step is asked
//! again.

use std::sync::Arc;

use randchat_types::error::UserError;
use randchat_types::language::LanguagesUpdate;
use randchat_types::user::{User, Wizard};
use tracing::debug;

use crate::directory::UserHandle;
use crate::i18n::{fill, text};
use crate::lifecycle::Lifecycle;
use crate::repository::talk::TalkRepository;
use crate::repository::user::UserRepository;
use crate::transport::ChatTransport;

/// Answer that keeps the current languages.
const KEEP_LANGUAGES: &str = "same";

pub struct SetupFlow<U: UserRepository, T: TalkRepository, C: ChatTransport> {
    lifecycle: Arc<Lifecycle<U, T, C>>,
}

impl<U: UserRepository, T: TalkRepository, C: ChatTransport> SetupFlow<U, T, C> {
    pub fn new(lifecycle: Arc<Lifecycle<U, T, C>>) -> Self {
        Self { lifecycle }
    }

    /// Take over the user's input at the first step.
    pub async fn start(&self, user: &UserHandle) -> Result<(), UserError> {
        self.move_to(user, Wizard::Languages).await
    }

    /// Ask the question of the current step again.
    pub async fn prompt(&self, user: &UserHandle) -> Result<(), UserError> {
        let record = user.snapshot().await;
        self.ask(&record).await
    }

    /// Consume one answer for the active step.
    pub async fn handle_input(&self, user: &UserHandle, input: &str) -> Result<(), UserError> {
        let step = user.snapshot().await.wizard;
        let (result, next) = match step {
            Wizard::None => return Ok(()),
            Wizard::Languages => {
                let update = if input.trim().eq_ignore_ascii_case(KEEP_LANGUAGES) {
                    LanguagesUpdate::Keep
                } else {
                    LanguagesUpdate::Replace(split_languages(input))
                };
                (self.lifecycle.set_languages(user, update).await, Wizard::Sex)
            }
            Wizard::Sex => (self.lifecycle.set_sex(user, input).await, Wizard::PartnerSex),
            Wizard::PartnerSex => (
                self.lifecycle.set_partner_sex(user, input).await,
                Wizard::None,
            ),
        };

        match result {
            Ok(()) => self.move_to(user, next).await,
            Err(e) if e.is_validation() => {
                debug!(user_id = %user.id(), step = %step, error = %e, "setup answer rejected");
                self.explain(user, &e).await?;
                self.prompt(user).await
            }
            Err(e) => Err(e),
        }
    }

    async fn move_to(&self, user: &UserHandle, step: Wizard) -> Result<(), UserError> {
        self.lifecycle
            .directory()
            .update(user, |record| {
                record.wizard = step;
                Ok(())
            })
            .await?;

        if step == Wizard::None {
            self.lifecycle.say_to(user, text::SETUP_DONE, &[]).await?;
            return Ok(());
        }
        self.prompt(user).await
    }

    async fn ask(&self, record: &User) -> Result<(), UserError> {
        match record.wizard {
            Wizard::None => {}
            Wizard::Languages if record.languages.is_empty() => {
                self.lifecycle.say(record, text::SETUP_LANGUAGES, &[]).await?;
            }
            Wizard::Languages => {
                let localizer = self.lifecycle.localizer();
                let question = localizer.translate(record.locale(), text::SETUP_LANGUAGES);
                let names = localizer
                    .language_names(record.locale(), record.languages.as_slice())
                    .join(", ");
                let keep = fill(
                    &localizer.translate(record.locale(), text::SETUP_LANGUAGES_KEEP),
                    &[&names],
                );
                self.lifecycle
                    .say(record, "{0}\n{1}", &[&question, &keep])
                    .await?;
            }
            Wizard::Sex => self.lifecycle.say(record, text::SETUP_SEX, &[]).await?,
            Wizard::PartnerSex => {
                self.lifecycle
                    .say(record, text::SETUP_PARTNER_SEX, &[])
                    .await?
            }
        }
        Ok(())
    }

    async fn explain(&self, user: &UserHandle, error: &UserError) -> Result<(), UserError> {
        match error {
            UserError::EmptyLanguages => {
                self.lifecycle.say_to(user, text::EMPTY_LANGUAGES, &[]).await?
            }
            UserError::TooManyLanguages { max, .. } => {
                self.lifecycle
                    .say_to(user, text::TOO_MANY_LANGUAGES, &[&max.to_string()])
                    .await?
            }
            UserError::InvalidSex(input) => {
                self.lifecycle
                    .say_to(user, text::UNKNOWN_SEX, &[input.as_str()])
                    .await?
            }
            _ => {}
        }
        Ok(())
    }
}

fn split_languages(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}
