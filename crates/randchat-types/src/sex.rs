//! Sex attribute and free-text normalization.
//!
//! Users type their answer in any supported locale ("male", "  МУЖСКОЙ ",
//! "girl"). [`normalize_sex`] is a pure function turning such input into a
//! [`SexInput`] variant; the mutation that stores the result lives elsewhere.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Sex of a user, or the sex they want their partner to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    #[serde(rename = "not_specified")]
    Unspecified,
    Male,
    Female,
}

impl Sex {
    pub fn is_specified(&self) -> bool {
        *self != Sex::Unspecified
    }
}

impl Default for Sex {
    fn default() -> Self {
        Sex::Unspecified
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Unspecified => write!(f, "not_specified"),
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_specified" => Ok(Sex::Unspecified),
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("invalid sex: '{other}'")),
        }
    }
}

/// Result of normalizing free-text sex input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexInput {
    Male,
    Female,
    Unspecified,
    Invalid,
}

impl SexInput {
    /// The recognized value, or `None` for [`SexInput::Invalid`].
    pub fn into_sex(self) -> Option<Sex> {
        match self {
            SexInput::Male => Some(Sex::Male),
            SexInput::Female => Some(Sex::Female),
            SexInput::Unspecified => Some(Sex::Unspecified),
            SexInput::Invalid => None,
        }
    }
}

impl From<Sex> for SexInput {
    fn from(sex: Sex) -> Self {
        match sex {
            Sex::Male => SexInput::Male,
            Sex::Female => SexInput::Female,
            Sex::Unspecified => SexInput::Unspecified,
        }
    }
}

/// Canonical spellings accepted regardless of locale.
const CANONICAL: &[(&str, Sex)] = &[
    ("male", Sex::Male),
    ("female", Sex::Female),
    ("not_specified", Sex::Unspecified),
    ("not specified", Sex::Unspecified),
];

/// Normalize free text into a [`SexInput`].
///
/// The input is trimmed and lowercased, then looked up among the canonical
/// names and the given synonyms (which are compared lowercased too).
///
/// # Examples
///
/// ```
/// use randchat_types::sex::{normalize_sex, Sex, SexInput};
///
/// let synonyms = [("boy".to_string(), Sex::Male)];
/// assert_eq!(normalize_sex("  MALE ", &synonyms), SexInput::Male);
/// assert_eq!(normalize_sex("Boy", &synonyms), SexInput::Male);
/// assert_eq!(normalize_sex("not_a_sex", &synonyms), SexInput::Invalid);
/// ```
pub fn normalize_sex(text: &str, synonyms: &[(String, Sex)]) -> SexInput {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return SexInput::Invalid;
    }

    CANONICAL
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, sex)| *sex)
        .or_else(|| {
            synonyms
                .iter()
                .find(|(name, _)| name.trim().to_lowercase() == needle)
                .map(|(_, sex)| *sex)
        })
        .map(SexInput::from)
        .unwrap_or(SexInput::Invalid)
}
