//! Built-in translation tables.
//!
//! English is the source language; Russian is the only other locale shipped
//! with the service. Unknown locales and untranslated strings fall back to
//! English.

use randchat_core::i18n::{Localizer, text};
use randchat_types::sex::Sex;

const SUPPORTED_LOCALES: &[&str] = &["en", "ru"];

const RU: &[(&str, &str)] = &[
    (text::PARTNER_FOUND, "Собеседник найден."),
    (text::ANOTHER_PARTNER_FOUND, "Вот ещё один незнакомец."),
    (text::BONUS_USED, "Вы использовали один бонус. Осталось бонусов: {0}."),
    (text::LAST_BONUS_USED, "Вы использовали последний бонус."),
    (text::USE_LANGUAGE, "Пожалуйста, используйте {0}."),
    (text::USE_LANGUAGES, "Вы можете использовать следующие языки: {0}."),
    (
        text::PARTNER_WAITED,
        "Собеседник искал вас {0}. Поздоровайтесь с ним -- если он не ответит, начните поиск заново командой /begin.",
    ),
    (text::MINUTES, "{0} мин"),
    (text::HOURS, "{0} ч"),
    (text::NICE_CHAT, "Приятного общения!"),
    (text::CHAT_FINISHED, "Чат завершён. Начните новый командой /begin."),
    (text::SEARCH_STOPPED, "Поиск собеседника остановлен."),
    (
        text::PARTNER_LEFT,
        "Собеседник покинул чат. Начните новый разговор командой /begin.",
    ),
    (text::LOOKING_FOR_PARTNER, "Ищем для вас незнакомца."),
    (
        text::BONUS_RECEIVED,
        "Вы получили бонус за приглашение в бот. Бонусы помогают быстрее находить собеседников. Всего бонусов: {0}. Поздравляем!",
    ),
    (text::PARTNER_BLOCKED, "Собеседник заблокировал меня! Как вам это удалось?!"),
    (text::UNSUPPORTED_CONTENT, "Сообщения такого типа не поддерживаются."),
    (
        text::UNKNOWN_COMMAND,
        "Неизвестная команда. Полный список команд: /help.",
    ),
    (
        text::NO_PARTNER,
        "Сейчас у вас нет собеседника. Используйте /begin, чтобы начать поиск.",
    ),
    (text::INTERNAL_ERROR, "Внутренняя ошибка. Администраторы уже уведомлены."),
    (
        text::MANUAL,
        "*Инструкция*\n\nИспользуйте /begin для поиска собеседника, а когда он найдётся, /end для завершения разговора.",
    ),
    (
        text::HELP,
        "*Помощь*\n\nИспользуйте /begin для поиска собеседника, а когда он найдётся, /end для завершения разговора.\n\nЕсли у вас есть предложения или нужна помощь, напишите {0}. При обращении укажите этот номер: {1}\n\nВерсия бота: {2}.",
    ),
    (
        text::SELF_INVITATION,
        "Не пытайтесь меня обмануть. Перешлите сообщение со ссылкой друзьям и получайте бонусы, которые помогут быстрее найти собеседника.",
    ),
    (
        text::STILL_SEARCHING,
        "Вы всё ещё ищете собеседника среди {0} человек. Вы можете поговорить с кем-то из них прямо сейчас, если снимете ограничение на пол собеседника или расширите список языков командой /setup.\nБольше людей -- больше веселья! Поделитесь этим сообщением в своих чатах:",
    ),
    (
        text::SHARE,
        "Хотите поговорить с кем-нибудь, попрактиковаться в иностранных языках или просто развлечься? Бот подберёт вам случайного собеседника нужного пола, говорящего на вашем языке. {0}",
    ),
    (
        text::SETUP_LANGUAGES,
        "*Настройка*\n\nНа каких языках вы говорите? Отправьте до 6 кодов языков через запятую, начиная с предпочтительного (например, \"ru, en\").",
    ),
    (
        text::SETUP_LANGUAGES_KEEP,
        "Отправьте \"same\", чтобы оставить текущие языки: {0}.",
    ),
    (
        text::SETUP_SEX,
        "Ваш пол? Отправьте \"мужской\", \"женский\" или \"не указан\".",
    ),
    (
        text::SETUP_PARTNER_SEX,
        "Какого пола должен быть собеседник? Отправьте \"мужской\", \"женский\" или \"не указан\".",
    ),
    (
        text::SETUP_DONE,
        "Спасибо. Используйте /begin для поиска собеседника, а когда он найдётся, /end для завершения разговора.",
    ),
    (text::EMPTY_LANGUAGES, "Укажите хотя бы один язык."),
    (text::TOO_MANY_LANGUAGES, "Слишком много языков. Можно указать не больше {0}."),
    (
        text::UNKNOWN_SEX,
        "Неизвестный пол: \"{0}\". Отправьте \"мужской\", \"женский\" или \"не указан\".",
    ),
];

/// Language code, English name, Russian name.
const LANGUAGE_NAMES: &[(&str, &str, &str)] = &[
    ("ar", "Arabic", "арабский"),
    ("de", "German", "немецкий"),
    ("en", "English", "английский"),
    ("es", "Spanish", "испанский"),
    ("fa", "Persian", "персидский"),
    ("fr", "French", "французский"),
    ("he", "Hebrew", "иврит"),
    ("hi", "Hindi", "хинди"),
    ("it", "Italian", "итальянский"),
    ("ja", "Japanese", "японский"),
    ("kk", "Kazakh", "казахский"),
    ("ko", "Korean", "корейский"),
    ("nl", "Dutch", "нидерландский"),
    ("pl", "Polish", "польский"),
    ("pt", "Portuguese", "португальский"),
    ("ru", "Russian", "русский"),
    ("sv", "Swedish", "шведский"),
    ("tr", "Turkish", "турецкий"),
    ("uk", "Ukrainian", "украинский"),
    ("zh", "Chinese", "китайский"),
];

const SEX_EN: &[(&str, Sex)] = &[
    ("man", Sex::Male),
    ("boy", Sex::Male),
    ("woman", Sex::Female),
    ("girl", Sex::Female),
    ("any", Sex::Unspecified),
];

const SEX_RU: &[(&str, Sex)] = &[
    ("мужской", Sex::Male),
    ("м", Sex::Male),
    ("парень", Sex::Male),
    ("женский", Sex::Female),
    ("ж", Sex::Female),
    ("девушка", Sex::Female),
    ("не указан", Sex::Unspecified),
    ("не важно", Sex::Unspecified),
    ("любой", Sex::Unspecified),
];

/// Localizer backed by the compiled-in tables above.
#[derive(Debug, Clone, Default)]
pub struct StaticLocalizer;

impl Localizer for StaticLocalizer {
    fn translate(&self, locale: &str, source: &str) -> String {
        let table = match locale {
            "ru" => RU,
            _ => return source.to_string(),
        };
        table
            .iter()
            .find(|(key, _)| *key == source)
            .map_or(source, |(_, translated)| *translated)
            .to_string()
    }

    fn language_names(&self, locale: &str, codes: &[String]) -> Vec<String> {
        codes
            .iter()
            .map(|code| {
                LANGUAGE_NAMES
                    .iter()
                    .find(|(c, _, _)| *c == code.as_str())
                    .map_or_else(
                        || code.clone(),
                        |(_, en, ru)| {
                            let name = if locale == "ru" { ru } else { en };
                            name.to_string()
                        },
                    )
            })
            .collect()
    }

    fn sex_synonyms(&self, locale: &str) -> Vec<(String, Sex)> {
        let table = match locale {
            "en" => SEX_EN,
            "ru" => SEX_RU,
            _ => &[],
        };
        table
            .iter()
            .map(|(word, sex)| (word.to_string(), *sex))
            .collect()
    }

    fn supported_locales(&self) -> Vec<String> {
        SUPPORTED_LOCALES.iter().map(|l| l.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use randchat_core::i18n::fill;
    use randchat_types::sex::{SexInput, normalize_sex};

    #[test]
    fn test_translate_falls_back_to_english() {
        let localizer = StaticLocalizer;
        assert_eq!(localizer.translate("en", text::NICE_CHAT), text::NICE_CHAT);
        assert_eq!(localizer.translate("it", text::NICE_CHAT), text::NICE_CHAT);
        assert_eq!(localizer.translate("ru", "no such text"), "no such text");
        assert_eq!(localizer.translate("ru", text::NICE_CHAT), "Приятного общения!");
    }

    #[test]
    fn test_every_russian_template_keeps_placeholders() {
        for (source, translated) in RU {
            for i in 0..3 {
                let placeholder = format!("{{{i}}}");
                assert_eq!(
                    source.contains(&placeholder),
                    translated.contains(&placeholder),
                    "placeholder {placeholder} mismatch in {source:?}"
                );
            }
        }
    }

    #[test]
    fn test_translated_template_fills() {
        let localizer = StaticLocalizer;
        let rendered = fill(&localizer.translate("ru", text::MINUTES), &["11"]);
        assert_eq!(rendered, "11 мин");
    }

    #[test]
    fn test_language_names() {
        let localizer = StaticLocalizer;
        let codes = vec!["en".to_string(), "ru".to_string(), "xx".to_string()];
        assert_eq!(localizer.language_names("en", &codes), vec!["English", "Russian", "xx"]);
        assert_eq!(
            localizer.language_names("ru", &codes),
            vec!["английский", "русский", "xx"]
        );
    }

    #[test]
    fn test_sex_synonyms_across_locales() {
        let synonyms = StaticLocalizer.all_sex_synonyms();
        assert_eq!(normalize_sex("Женский", &synonyms), SexInput::Female);
        assert_eq!(normalize_sex("boy", &synonyms), SexInput::Male);
        assert_eq!(normalize_sex("не важно", &synonyms), SexInput::Unspecified);
        assert_eq!(normalize_sex("robot", &synonyms), SexInput::Invalid);
    }
}
