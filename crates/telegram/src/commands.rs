//! Administrative slash commands.

use {relaybot_relay::SenderId, teloxide::types::BotCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Settings,
    SetChannel(String),
    SetSuffix(String),
    ClearSuffix,
    AddUser(SenderId),
    RemoveUser(SenderId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a numeric user id")]
    InvalidUserId(String),
}

/// Parse a slash command. Returns `None` for anything that is not one of the
/// commands above, including `/original`, so it can be treated as text.
///
/// `/cmd@botname` is accepted. Arguments are everything after the first
/// whitespace, so a suffix may span several lines.
pub fn parse(text: &str) -> Option<Result<Command, CommandError>> {
    let body = text.trim_start().strip_prefix('/')?;
    let (head, rest) = match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (body, ""),
    };
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

    let command = match name.as_str() {
        "start" => Ok(Command::Start),
        "help" => Ok(Command::Help),
        "settings" => Ok(Command::Settings),
        "clearsuffix" => Ok(Command::ClearSuffix),
        "setchannel" => required(rest, "/setchannel <channel id or @username>")
            .map(|id| Command::SetChannel(id.to_string())),
        "setsuffix" => {
            required(rest, "/setsuffix <text>").map(|text| Command::SetSuffix(text.to_string()))
        },
        "adduser" => user_id(rest, "/adduser <user id>").map(Command::AddUser),
        "removeuser" => user_id(rest, "/removeuser <user id>").map(Command::RemoveUser),
        _ => return None,
    };
    Some(command)
}

fn required<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(rest)
    }
}

fn user_id(rest: &str, usage: &'static str) -> Result<SenderId, CommandError> {
    let raw = required(rest, usage)?;
    raw.parse::<u64>()
        .map(SenderId)
        .map_err(|_| CommandError::InvalidUserId(raw.to_string()))
}

/// Commands registered with Telegram for client autocomplete.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("help", "Show usage and your user id"),
        BotCommand::new("settings", "Show relay settings"),
        BotCommand::new("setchannel", "Set the destination channel"),
        BotCommand::new("setsuffix", "Set the caption suffix"),
        BotCommand::new("clearsuffix", "Remove the caption suffix"),
        BotCommand::new("adduser", "Authorize a user (owners only)"),
        BotCommand::new("removeuser", "Revoke a user (owners only)"),
    ]
}

pub const HELP_TEXT: &str = "\
Send one or more videos, documents, photos, audio files or animations.

Several items sent together are relayed to the channel as a batch, each with its own caption.
A single item waits for you to send its caption as the next message.
A t.me/<channel>/<post> link copies that public post to the channel.

Commands:
/settings - show relay settings
/setchannel <id or @username> - set the destination channel
/setsuffix <text> - append text to every caption
/clearsuffix - stop appending a suffix
/adduser <user id> - authorize a user (owners only)
/removeuser <user id> - revoke a user (owners only)";
