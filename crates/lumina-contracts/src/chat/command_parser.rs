use super::command_registry::{find_command, CommandKind, CommandSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewTarget {
    All,
    One(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Noop,
    Load { path: String },
    Edit { prompt: Option<String> },
    SetPrompt { prompt: String },
    ResetPrompt,
    Suggestions,
    UseSuggestion { id: String },
    Explore,
    Preview { target: PreviewTarget },
    CloseExplorer,
    Compare { on: bool },
    History,
    Restore { id: String },
    Save { path: Option<String> },
    Export { dir: Option<String> },
    Clear,
    Status,
    Help,
    Quit,
    /// Known command with an unusable argument.
    Invalid { command: String, usage: String },
    Unknown { command: String, arg: String },
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> Option<String> {
    let parts = parse_path_args(arg);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn parse_toggle(arg: &str) -> Option<bool> {
    match arg.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "yes" | "hold" => Some(true),
        "off" | "0" | "false" | "no" | "release" => Some(false),
        _ => None,
    }
}

fn invalid(spec: &CommandSpec) -> ChatCommand {
    ChatCommand::Invalid {
        command: spec.command.to_string(),
        usage: spec.usage.to_string(),
    }
}

fn build_command(spec: &CommandSpec, arg: &str) -> ChatCommand {
    let text = (!arg.is_empty()).then(|| arg.to_string());
    let path = parse_single_path_arg(arg);
    let id = arg.split_whitespace().next().map(str::to_string);

    match spec.kind {
        CommandKind::Load => match path {
            Some(path) => ChatCommand::Load { path },
            None => invalid(spec),
        },
        CommandKind::Edit => ChatCommand::Edit { prompt: text },
        CommandKind::Prompt => match text {
            Some(prompt) => ChatCommand::SetPrompt { prompt },
            None => invalid(spec),
        },
        CommandKind::ResetPrompt => ChatCommand::ResetPrompt,
        CommandKind::Suggestions => ChatCommand::Suggestions,
        CommandKind::Use => match id {
            Some(id) => ChatCommand::UseSuggestion { id },
            None => invalid(spec),
        },
        CommandKind::Explore => ChatCommand::Explore,
        CommandKind::Preview => match id {
            Some(id) if id.eq_ignore_ascii_case("all") => ChatCommand::Preview {
                target: PreviewTarget::All,
            },
            Some(id) => ChatCommand::Preview {
                target: PreviewTarget::One(id),
            },
            None => invalid(spec),
        },
        CommandKind::Close => ChatCommand::CloseExplorer,
        CommandKind::Compare => match parse_toggle(arg) {
            Some(on) => ChatCommand::Compare { on },
            None => invalid(spec),
        },
        CommandKind::History => ChatCommand::History,
        CommandKind::Restore => match id {
            Some(id) => ChatCommand::Restore { id },
            None => invalid(spec),
        },
        CommandKind::Save => ChatCommand::Save { path },
        CommandKind::Export => ChatCommand::Export { dir: path },
        CommandKind::Clear => ChatCommand::Clear,
        CommandKind::Status => ChatCommand::Status,
        CommandKind::Help => ChatCommand::Help,
        CommandKind::Quit => ChatCommand::Quit,
    }
}

/// Parses one line of interactive input. Lines without a leading slash are
/// edit requests with that text as the prompt. Slash lines are always commands.
pub fn parse_chat_command(text: &str) -> ChatCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return ChatCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len == 0 {
            return ChatCommand::Unknown {
                command: String::new(),
                arg: slash_tail.trim().to_string(),
            };
        }
        let command = slash_tail[..command_len].to_ascii_lowercase();
        let arg = slash_tail[command_len..].trim();
        let command = match command.as_str() {
            "exit" | "q" => "quit".to_string(),
            "reset" => "reset_prompt".to_string(),
            _ => command,
        };
        return match find_command(&command) {
            Some(spec) => build_command(spec, arg),
            None => ChatCommand::Unknown {
                command,
                arg: arg.to_string(),
            },
        };
    }

    ChatCommand::Edit {
        prompt: Some(raw_trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_chat_command, ChatCommand, PreviewTarget};
    use crate::chat::chat_help_rows;

    #[test]
    fn plain_text_is_an_edit_request() {
        assert_eq!(
            parse_chat_command("  make it sepia  "),
            ChatCommand::Edit {
                prompt: Some("make it sepia".to_string())
            }
        );
        assert_eq!(parse_chat_command("   "), ChatCommand::Noop);
        assert_eq!(parse_chat_command("/edit"), ChatCommand::Edit { prompt: None });
    }

    #[test]
    fn load_accepts_quoted_paths() {
        assert_eq!(
            parse_chat_command("/load \"/tmp/my photo.png\""),
            ChatCommand::Load {
                path: "/tmp/my photo.png".to_string()
            }
        );
        assert_eq!(
            parse_chat_command("/load a.png"),
            ChatCommand::Load {
                path: "a.png".to_string()
            }
        );
        assert!(matches!(
            parse_chat_command("/load"),
            ChatCommand::Invalid { command, .. } if command == "load"
        ));
    }

    #[test]
    fn preview_target_and_compare_toggle() {
        assert_eq!(
            parse_chat_command("/preview ALL"),
            ChatCommand::Preview {
                target: PreviewTarget::All
            }
        );
        assert_eq!(
            parse_chat_command("/preview neon-noir"),
            ChatCommand::Preview {
                target: PreviewTarget::One("neon-noir".to_string())
            }
        );
        assert_eq!(
            parse_chat_command("/compare on"),
            ChatCommand::Compare { on: true }
        );
        assert_eq!(
            parse_chat_command("/compare off"),
            ChatCommand::Compare { on: false }
        );
        assert!(matches!(
            parse_chat_command("/compare maybe"),
            ChatCommand::Invalid { .. }
        ));
    }

    #[test]
    fn prompt_keeps_full_text_and_aliases_resolve() {
        assert_eq!(
            parse_chat_command("/prompt warm film look, soft grain"),
            ChatCommand::SetPrompt {
                prompt: "warm film look, soft grain".to_string()
            }
        );
        assert_eq!(parse_chat_command("/reset"), ChatCommand::ResetPrompt);
        assert_eq!(parse_chat_command("/exit"), ChatCommand::Quit);
        assert_eq!(
            parse_chat_command("/save"),
            ChatCommand::Save { path: None }
        );
        assert_eq!(
            parse_chat_command("/export out/dir"),
            ChatCommand::Export {
                dir: Some("out/dir".to_string())
            }
        );
    }

    #[test]
    fn unknown_command_keeps_argument() {
        assert_eq!(
            parse_chat_command("/magic foo bar"),
            ChatCommand::Unknown {
                command: "magic".to_string(),
                arg: "foo bar".to_string()
            }
        );
    }

    #[test]
    fn bare_slash_is_never_an_edit() {
        assert_eq!(
            parse_chat_command("/"),
            ChatCommand::Unknown {
                command: String::new(),
                arg: String::new()
            }
        );
        assert_eq!(
            parse_chat_command("/ make it sepia"),
            ChatCommand::Unknown {
                command: String::new(),
                arg: "make it sepia".to_string()
            }
        );
    }

    #[test]
    fn every_registered_command_parses_to_a_known_command() {
        let samples = [
            "/load a.png",
            "/edit",
            "/prompt warm",
            "/reset_prompt",
            "/suggestions",
            "/use neon-noir",
            "/explore",
            "/preview all",
            "/close",
            "/compare on",
            "/history",
            "/restore abc",
            "/save",
            "/export",
            "/clear",
            "/status",
            "/help",
            "/quit",
        ];
        assert_eq!(samples.len(), chat_help_rows().len());
        for line in samples {
            assert!(
                !matches!(
                    parse_chat_command(line),
                    ChatCommand::Unknown { .. } | ChatCommand::Invalid { .. }
                ),
                "{line} did not parse"
            );
        }
    }

    #[test]
    fn help_rows_cover_every_command() {
        let rows = chat_help_rows();
        assert!(rows.iter().any(|(usage, _)| *usage == "/load <path>"));
        assert!(rows.iter().all(|(usage, _)| usage.starts_with('/')));
        assert_eq!(parse_chat_command("/help"), ChatCommand::Help);
    }
}
