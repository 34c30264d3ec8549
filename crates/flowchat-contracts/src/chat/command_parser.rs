use super::command_registry::{find_action, CommandAction, NO_ARG_COMMANDS, SINGLE_PATH_COMMANDS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Noop,
    Prompt(String),
    Help,
    Quit,
    History,
    Detach,
    Attach { path: Option<String> },
    Unknown(String),
}

fn parse_path_arg(arg: &str) -> Option<String> {
    if arg.trim().is_empty() {
        return None;
    }
    let parts = match shell_words::split(arg) {
        Ok(parts) => parts,
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    };
    let joined = parts
        .into_iter()
        .filter(|value| !value.is_empty())
        .collect::<Vec<String>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Classifies one line of chat input. Lines starting with `/` followed by a
/// word are commands; anything else is a prompt for the flow.
pub fn parse_command(text: &str) -> ChatCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return ChatCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if find_action(&command, SINGLE_PATH_COMMANDS) == Some(CommandAction::Attach) {
                return ChatCommand::Attach {
                    path: parse_path_arg(arg),
                };
            }

            return match find_action(&command, NO_ARG_COMMANDS) {
                Some(CommandAction::Help) => ChatCommand::Help,
                Some(CommandAction::Quit) => ChatCommand::Quit,
                Some(CommandAction::History) => ChatCommand::History,
                Some(CommandAction::Detach) => ChatCommand::Detach,
                _ => ChatCommand::Unknown(command),
            };
        }
    }

    ChatCommand::Prompt(raw_trimmed.to_string())
}
