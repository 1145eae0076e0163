//! Localization port and message templates.
//!
//! Templates are English source strings with positional `{0}`, `{1}`
//! placeholders. A [`Localizer`] maps them to other locales; untranslated
//! strings fall back to English.

pub mod text;

use randchat_types::sex::Sex;

/// Translation tables consumed by the core.
///
/// Synchronous and object-safe: implementations are static tables, shared as
/// `Arc<dyn Localizer>`.
pub trait Localizer: Send + Sync {
    /// Translate an English template into `locale`, or return it unchanged.
    fn translate(&self, locale: &str, text: &str) -> String;

    /// Display names of language codes, rendered in `locale`.
    fn language_names(&self, locale: &str, codes: &[String]) -> Vec<String>;

    /// Words accepted as sex answers in `locale`.
    fn sex_synonyms(&self, locale: &str) -> Vec<(String, Sex)>;

    fn supported_locales(&self) -> Vec<String>;

    /// Synonyms from every supported locale, for locale-agnostic parsing.
    fn all_sex_synonyms(&self) -> Vec<(String, Sex)> {
        self.supported_locales()
            .iter()
            .flat_map(|locale| self.sex_synonyms(locale))
            .collect()
    }
}

/// English-only localizer: templates pass through, codes are their own names.
#[derive(Debug, Clone, Default)]
pub struct PassthroughLocalizer;

impl Localizer for PassthroughLocalizer {
    fn translate(&self, _locale: &str, text: &str) -> String {
        text.to_string()
    }

    fn language_names(&self, _locale: &str, codes: &[String]) -> Vec<String> {
        codes.to_vec()
    }

    fn sex_synonyms(&self, _locale: &str) -> Vec<(String, Sex)> {
        Vec::new()
    }

    fn supported_locales(&self) -> Vec<String> {
        vec!["en".to_string()]
    }
}

/// Substitute positional placeholders.
///
/// ```
/// use randchat_core::i18n::fill;
/// assert_eq!(fill("{0} of {1}", &["one", "two"]), "one of two");
/// ```
pub fn fill(template: &str, args: &[&str]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |acc, (i, arg)| {
            acc.replace(&format!("{{{i}}}"), arg)
        })
}
