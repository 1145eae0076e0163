//! English source strings for every message the service sends.
//!
//! These double as translation keys.

pub const PARTNER_FOUND: &str = "Your partner is here.";
pub const ANOTHER_PARTNER_FOUND: &str = "Here's another stranger.";
pub const BONUS_USED: &str = "You've used one bonus. {0} bonus(es) left.";
pub const LAST_BONUS_USED: &str = "You've used your last bonus.";
pub const USE_LANGUAGE: &str = "Use {0} please.";
pub const USE_LANGUAGES: &str = "You can use the following languages: {0}.";
pub const PARTNER_WAITED: &str = "Your partner's been looking for you for {0}. Say him \"Hello\" -- if he doesn't respond to you, launch search again by /begin command.";
pub const MINUTES: &str = "{0} min";
pub const HOURS: &str = "{0} hr";
pub const NICE_CHAT: &str = "Have a nice chat!";

pub const CHAT_FINISHED: &str = "Chat was finished. Feel free to /begin a new one.";
pub const SEARCH_STOPPED: &str = "Looking for partner was stopped.";
pub const PARTNER_LEFT: &str = "Your partner has left chat. Feel free to /begin a new conversation.";
pub const LOOKING_FOR_PARTNER: &str = "Looking for a stranger for you.";
pub const BONUS_RECEIVED: &str = "You've received one bonus for inviting a person to the bot. Bonuses will help you to find partners quickly. Total bonus count: {0}. Congratulations!";

pub const PARTNER_BLOCKED: &str = "Your partner has blocked me! How did you do that?!";
pub const UNSUPPORTED_CONTENT: &str = "Messages of this type aren't supported.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Look /help for the full list of commands.";
pub const NO_PARTNER: &str = "You have no partner right now. Use /begin to start looking for one.";
pub const INTERNAL_ERROR: &str = "Internal error. Admins are already notified about that";

pub const MANUAL: &str = "*Manual*\n\nUse /begin to start looking for a conversational partner, once you're matched you can use /end to end the conversation.";
pub const HELP: &str = "*Help*\n\nUse /begin to start looking for a conversational partner, once you're matched you can use /end to end the conversation.\n\nIf you have any suggestions or require help, please contact {0}. When asking questions, please provide this number: {1}\n\nYou're welcome to inspect and improve the bot's source code, version {2}.";
pub const SELF_INVITATION: &str = "Don't try to fool me. Forward message with the link to your friends and receive well-earned bonuses that will help you to find partner quickly.";

pub const STILL_SEARCHING: &str = "You're still searching for partner among {0} people. You can talk with some of them right now if you remove partner's sex restrictions or extend the list of languages you know using /setup command.\nMore people -- more fun! Spread Rand Talk between your friends. The more people will use your link -- the faster partner's search will be. Share the following message in your chats:";
pub const SHARE: &str = "Do you want to talk with somebody, practice in foreign languages or you just want to have some fun? Rand Talk will help you! It's a bot matching you with a random stranger of desired sex speaking on your language. {0}";

pub const SETUP_LANGUAGES: &str = "*Setup*\n\nWhich languages do you speak? Send up to 6 language codes separated by commas, most preferred first (e.g. \"en, ru\").";
pub const SETUP_LANGUAGES_KEEP: &str = "Send \"same\" to keep your current languages: {0}.";
pub const SETUP_SEX: &str = "What's your sex? Send \"male\", \"female\" or \"not specified\".";
pub const SETUP_PARTNER_SEX: &str = "What sex should your partner have? Send \"male\", \"female\" or \"not specified\".";
pub const SETUP_DONE: &str = "Thank you. Use /begin to start looking for a conversational partner, once you're matched you can use /end to end the conversation.";
pub const EMPTY_LANGUAGES: &str = "Please specify at least one language.";
pub const TOO_MANY_LANGUAGES: &str = "Too many languages. You can specify at most {0}.";
pub const UNKNOWN_SEX: &str = "Unknown sex: \"{0}\". Send \"male\", \"female\" or \"not specified\".";
