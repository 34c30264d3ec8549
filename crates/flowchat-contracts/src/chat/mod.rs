mod command_parser;
mod command_registry;
mod turn;

pub use command_parser::{parse_command, ChatCommand};
pub use command_registry::CHAT_HELP_COMMANDS;
pub use turn::{ChatTurn, ContentItem, Role};
