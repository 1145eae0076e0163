use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::invitation::Invitation;
use crate::language::Languages;
use crate::sex::Sex;

/// Identifier of a user on the external messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Position of a user in the pairing lifecycle.
///
/// - Idle: not chatting, not in the waiting pool
/// - Waiting: in the pool since the given instant
/// - Chatting: linked to a partner (the partner links back)
///
/// Being a single enum, a record can never be waiting and chatting at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChatState {
    Idle,
    Waiting { since: DateTime<Utc> },
    Chatting { partner: UserId },
}

impl ChatState {
    pub fn partner(&self) -> Option<UserId> {
        match self {
            ChatState::Chatting { partner } => Some(*partner),
            _ => None,
        }
    }

    pub fn waiting_since(&self) -> Option<DateTime<Utc>> {
        match self {
            ChatState::Waiting { since } => Some(*since),
            _ => None,
        }
    }

    /// Rebuild the state from its two persisted columns.
    ///
    /// A row carrying both a partner and a waiting timestamp is resolved in
    /// favour of the partner link.
    pub fn from_columns(partner: Option<UserId>, since: Option<DateTime<Utc>>) -> Self {
        match (partner, since) {
            (Some(partner), _) => ChatState::Chatting { partner },
            (None, Some(since)) => ChatState::Waiting { since },
            (None, None) => ChatState::Idle,
        }
    }
}

impl Default for ChatState {
    fn default() -> Self {
        ChatState::Idle
    }
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatState::Idle => write!(f, "idle"),
            ChatState::Waiting { .. } => write!(f, "waiting"),
            ChatState::Chatting { .. } => write!(f, "chatting"),
        }
    }
}

/// Which setup step (if any) currently owns the user's text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wizard {
    None,
    Languages,
    Sex,
    PartnerSex,
}

impl Wizard {
    pub fn is_active(&self) -> bool {
        *self != Wizard::None
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Wizard::None
    }
}

impl fmt::Display for Wizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wizard::None => write!(f, "none"),
            Wizard::Languages => write!(f, "languages"),
            Wizard::Sex => write!(f, "sex"),
            Wizard::PartnerSex => write!(f, "partner_sex"),
        }
    }
}

impl FromStr for Wizard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Wizard::None),
            "languages" => Ok(Wizard::Languages),
            "sex" => Ok(Wizard::Sex),
            "partner_sex" => Ok(Wizard::PartnerSex),
            other => Err(format!("invalid wizard state: '{other}'")),
        }
    }
}

/// A user record: matching attributes plus current session state.
///
/// `partner` and `invited_by` are stored as identities; the live instances
/// behind them are resolved through the session directory so everyone
/// observes the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Token used to build this user's referral link. Never changes.
    pub invitation: Invitation,
    /// The user who invited this one, if any.
    pub invited_by: Option<UserId>,
    /// Whether the inviter has already been rewarded for this user.
    pub referral_credited: bool,
    pub bonus_count: u32,
    /// Languages in preference order, most preferred first.
    pub languages: Languages,
    /// `None` until the user answers; `Some(Sex::Unspecified)` is an explicit answer.
    pub sex: Option<Sex>,
    pub partner_sex: Option<Sex>,
    pub state: ChatState,
    pub wizard: Wizard,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh idle record with nothing configured.
    pub fn new(id: UserId, invitation: Invitation) -> Self {
        Self {
            id,
            invitation,
            invited_by: None,
            referral_credited: false,
            bonus_count: 0,
            languages: Languages::default(),
            sex: None,
            partner_sex: None,
            state: ChatState::Idle,
            wizard: Wizard::None,
            created_at: Utc::now(),
        }
    }

    pub fn partner(&self) -> Option<UserId> {
        self.state.partner()
    }

    pub fn looking_for_partner_from(&self) -> Option<DateTime<Utc>> {
        self.state.waiting_since()
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state, ChatState::Waiting { .. })
    }

    pub fn is_chatting(&self) -> bool {
        matches!(self.state, ChatState::Chatting { .. })
    }

    /// Own sex as used by matching (unanswered counts as unspecified).
    pub fn own_sex(&self) -> Sex {
        self.sex.unwrap_or_default()
    }

    /// Desired partner sex as used by matching.
    pub fn wanted_sex(&self) -> Sex {
        self.partner_sex.unwrap_or_default()
    }

    /// Nothing has been configured yet.
    pub fn is_novice(&self) -> bool {
        self.languages.is_empty() && self.sex.is_none() && self.partner_sex.is_none()
    }

    /// Every matching attribute has been configured.
    pub fn is_full(&self) -> bool {
        !self.languages.is_empty() && self.sex.is_some() && self.partner_sex.is_some()
    }

    pub fn speaks(&self, language: &str) -> bool {
        self.languages.contains(language)
    }

    /// Languages shared with `other`, in this user's preference order.
    pub fn common_languages(&self, other: &User) -> Vec<String> {
        self.languages.common_with(&other.languages)
    }

    /// Locale used to render notifications for this user.
    pub fn locale(&self) -> &str {
        self.languages.first().unwrap_or(crate::language::DEFAULT_LOCALE)
    }
}
