mod command_parser;
mod command_registry;

pub use command_parser::{parse_chat_command, ChatCommand, PreviewTarget};
pub use command_registry::chat_help_rows;
