#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    Help,
    Quit,
    History,
    Attach,
    Detach,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
}

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: CommandAction::Help,
    },
    CommandSpec {
        command: "quit",
        action: CommandAction::Quit,
    },
    CommandSpec {
        command: "exit",
        action: CommandAction::Quit,
    },
    CommandSpec {
        command: "history",
        action: CommandAction::History,
    },
    CommandSpec {
        command: "detach",
        action: CommandAction::Detach,
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "image",
    action: CommandAction::Attach,
}];

pub const CHAT_HELP_COMMANDS: &[&str] = &["/help", "/image <path>", "/detach", "/history", "/quit"];

pub(crate) fn find_action(command: &str, specs: &[CommandSpec]) -> Option<CommandAction> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

#[cfg(test)]
mod tests {
    use super::{
        find_action, CommandAction, CHAT_HELP_COMMANDS, NO_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
    };

    #[test]
    fn every_help_entry_resolves_to_an_action() {
        for entry in CHAT_HELP_COMMANDS {
            let command = entry
                .trim_start_matches('/')
                .split_whitespace()
                .next()
                .unwrap_or_default();
            let action = find_action(command, NO_ARG_COMMANDS)
                .or_else(|| find_action(command, SINGLE_PATH_COMMANDS));
            assert!(action.is_some(), "help lists unknown command {entry}");
        }
    }

    #[test]
    fn exit_aliases_quit() {
        assert_eq!(find_action("exit", NO_ARG_COMMANDS), Some(CommandAction::Quit));
    }
}
