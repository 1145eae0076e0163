//! Ordered language preferences.

use serde::{Deserialize, Serialize};

use crate::error::UserError;

/// Maximum number of languages a user may list.
pub const MAX_LANGUAGES: usize = 6;

/// Locale used when a user has not listed any language.
pub const DEFAULT_LOCALE: &str = "en";

/// Language codes in preference order, most preferred first.
///
/// An empty list is a valid stored value meaning "unknown languages", but
/// [`Languages::new`] never produces one: users cannot explicitly set an
/// empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Languages(Vec<String>);

impl Languages {
    /// Validate and normalize user-supplied codes.
    ///
    /// Codes are trimmed and lowercased; blanks are skipped and duplicates
    /// keep their first position.
    pub fn new<I, S>(codes: I) -> Result<Self, UserError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim().to_lowercase();
            if !code.is_empty() && !normalized.contains(&code) {
                normalized.push(code);
            }
        }

        if normalized.is_empty() {
            return Err(UserError::EmptyLanguages);
        }
        if normalized.len() > MAX_LANGUAGES {
            return Err(UserError::TooManyLanguages {
                count: normalized.len(),
                max: MAX_LANGUAGES,
            });
        }

        Ok(Self(normalized))
    }

    /// Wrap codes read back from storage without re-validating them.
    pub fn from_stored(codes: Vec<String>) -> Self {
        Self(codes)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    /// Codes also present in `other`, in this list's order.
    pub fn common_with(&self, other: &Languages) -> Vec<String> {
        self.0
            .iter()
            .filter(|code| other.contains(code))
            .cloned()
            .collect()
    }

    /// Index (in this list) of the most preferred language `other` speaks.
    pub fn best_shared_priority(&self, other: &Languages) -> Option<usize> {
        self.0.iter().position(|code| other.contains(code))
    }
}

/// How a languages update should treat the current list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguagesUpdate {
    /// Keep the current languages. Fails if the user has none yet.
    Keep,
    /// Replace the current languages. An empty list always fails.
    Replace(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_six_languages() {
        let languages = Languages::new(["ru", "en", "it", "fr", "de", "pt"]).unwrap();
        assert_eq!(languages.as_slice(), ["ru", "en", "it", "fr", "de", "pt"]);
    }

    #[test]
    fn test_new_rejects_seven_languages() {
        let err = Languages::new(["ru", "en", "it", "fr", "de", "pt", "po"]).unwrap_err();
        assert!(matches!(err, UserError::TooManyLanguages { count: 7, max: 6 }));
    }

    #[test]
    fn test_new_rejects_empty() {
        let err = Languages::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, UserError::EmptyLanguages));
        let err = Languages::new(["  ", ""]).unwrap_err();
        assert!(matches!(err, UserError::EmptyLanguages));
    }

    #[test]
    fn test_new_normalizes_and_dedupes() {
        let languages = Languages::new([" EN", "ru", "en "]).unwrap();
        assert_eq!(languages.as_slice(), ["en", "ru"]);
    }

    #[test]
    fn test_best_shared_priority() {
        let seeker = Languages::new(["foo", "bar", "baz"]).unwrap();
        let a = Languages::new(["bar"]).unwrap();
        let b = Languages::new(["zen", "foo"]).unwrap();
        let c = Languages::new(["zen"]).unwrap();
        assert_eq!(seeker.best_shared_priority(&a), Some(1));
        assert_eq!(seeker.best_shared_priority(&b), Some(0));
        assert_eq!(seeker.best_shared_priority(&c), None);
        assert_eq!(Languages::default().best_shared_priority(&a), None);
    }
}
