/// Which `ChatCommand` a registry entry builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Load,
    Edit,
    Prompt,
    ResetPrompt,
    Suggestions,
    Use,
    Explore,
    Preview,
    Close,
    Compare,
    History,
    Restore,
    Save,
    Export,
    Clear,
    Status,
    Help,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub kind: CommandKind,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "load",
        kind: CommandKind::Load,
        usage: "/load <path>",
        summary: "load a photo and fetch style suggestions",
    },
    CommandSpec {
        command: "edit",
        kind: CommandKind::Edit,
        usage: "/edit [prompt]",
        summary: "apply the current (or given) prompt",
    },
    CommandSpec {
        command: "prompt",
        kind: CommandKind::Prompt,
        usage: "/prompt <text>",
        summary: "replace the current prompt",
    },
    CommandSpec {
        command: "reset_prompt",
        kind: CommandKind::ResetPrompt,
        usage: "/reset_prompt",
        summary: "restore the default prompt",
    },
    CommandSpec {
        command: "suggestions",
        kind: CommandKind::Suggestions,
        usage: "/suggestions",
        summary: "list style suggestions for the loaded photo",
    },
    CommandSpec {
        command: "use",
        kind: CommandKind::Use,
        usage: "/use <suggestion-id>",
        summary: "copy a suggestion's instruction into the prompt",
    },
    CommandSpec {
        command: "explore",
        kind: CommandKind::Explore,
        usage: "/explore",
        summary: "open the style explorer",
    },
    CommandSpec {
        command: "preview",
        kind: CommandKind::Preview,
        usage: "/preview <suggestion-id|all>",
        summary: "render speculative previews in the explorer",
    },
    CommandSpec {
        command: "close",
        kind: CommandKind::Close,
        usage: "/close",
        summary: "close the style explorer and drop its previews",
    },
    CommandSpec {
        command: "compare",
        kind: CommandKind::Compare,
        usage: "/compare on|off",
        summary: "show the original instead of the edit while on",
    },
    CommandSpec {
        command: "history",
        kind: CommandKind::History,
        usage: "/history",
        summary: "list past edits, newest first",
    },
    CommandSpec {
        command: "restore",
        kind: CommandKind::Restore,
        usage: "/restore <history-id>",
        summary: "show a past edit again",
    },
    CommandSpec {
        command: "save",
        kind: CommandKind::Save,
        usage: "/save [path]",
        summary: "write the current edit to disk",
    },
    CommandSpec {
        command: "export",
        kind: CommandKind::Export,
        usage: "/export [dir]",
        summary: "write every history entry plus history.json",
    },
    CommandSpec {
        command: "clear",
        kind: CommandKind::Clear,
        usage: "/clear",
        summary: "unload the photo (history is kept)",
    },
    CommandSpec {
        command: "status",
        kind: CommandKind::Status,
        usage: "/status",
        summary: "print the session state",
    },
    CommandSpec {
        command: "help",
        kind: CommandKind::Help,
        usage: "/help",
        summary: "list commands",
    },
    CommandSpec {
        command: "quit",
        kind: CommandKind::Quit,
        usage: "/quit",
        summary: "leave the session",
    },
];

pub(crate) fn find_command(command: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.command == command)
}

/// `(usage, summary)` rows for help output.
pub fn chat_help_rows() -> Vec<(&'static str, &'static str)> {
    COMMANDS
        .iter()
        .map(|spec| (spec.usage, spec.summary))
        .collect()
}
