//! Slash-command parsing.

/// A recognized command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Begin,
    End,
    Help,
    Setup,
    /// `/start`, optionally with the referral start argument.
    Start(Option<String>),
}

/// Outcome of reading a text message as a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Known(Command),
    Unknown(String),
}

/// Parse `/name [args]`.
///
/// Returns `None` when the text is not command-shaped (no leading slash, or
/// a name outside `[a-z_]+`); such text is ordinary chat content. A trailing
/// `@botname` on the command name is ignored.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return None;
    }

    let args = (!args.is_empty()).then(|| args.to_string());
    let command = match name {
        "begin" => Command::Begin,
        "end" => Command::End,
        "help" => Command::Help,
        "setup" => Command::Setup,
        "start" => Command::Start(args),
        other => return Some(ParsedCommand::Unknown(other.to_string())),
    };
    Some(ParsedCommand::Known(command))
}
