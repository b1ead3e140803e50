// CLI module
// Public interface for command-line interface

mod commands;
mod repl;

pub use commands::{
    format_help, format_prompts, format_resources, format_tools, handle_command,
    resolve_resource, Command,
};
pub use repl::Repl;
