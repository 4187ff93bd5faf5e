//! User-facing surfaces: command-line arguments and the text command surface.

mod cli;
mod commands;

pub use cli::{Args, Cli};
pub use commands::{parse_command, CommandReply, CommandSurface, ParsedLine, UserCommand, HELP_TEXT};
