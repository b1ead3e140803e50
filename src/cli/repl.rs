// Interactive REPL

use anyhow::{Context, Result};
use crossterm::{style::Stylize, terminal};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use crate::agent::Agent;
use crate::tools::mcp::McpClient;

use super::commands::{format_help, handle_command, Command};

/// Get current terminal width, or default to 80 if not a TTY
fn terminal_width() -> usize {
    terminal::size().map(|(w, _)| w as usize).unwrap_or(80)
}

pub struct Repl {
    client: Arc<McpClient>,
    agent: Agent,
    is_interactive: bool,
}

impl Repl {
    pub fn new(client: Arc<McpClient>, agent: Agent) -> Self {
        Self {
            client,
            agent,
            is_interactive: io::stdout().is_terminal(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;

        self.print_banner().await;

        loop {
            if self.is_interactive {
                println!();
            }

            // rustyline blocks; keep the MCP reader tasks running meanwhile
            let line = tokio::task::block_in_place(|| editor.readline("You: "));
            let line = match line {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e).context("Failed to read input"),
            };

            let command = match Command::parse(&line) {
                Ok(Command::Empty) => continue,
                Ok(Command::Quit) => break,
                Ok(command) => command,
                Err(e) => {
                    self.print_error(&e);
                    continue;
                }
            };

            if let Err(e) = editor.add_history_entry(line.trim()) {
                tracing::debug!("Failed to record history entry: {}", e);
            }

            match handle_command(command, &self.client, &mut self.agent).await {
                Ok(output) => println!("{}", output),
                Err(e) => self.print_error(&e),
            }
        }

        if self.is_interactive {
            println!("Goodbye!");
        }
        Ok(())
    }

    async fn print_banner(&self) {
        if !self.is_interactive {
            eprintln!("# wikiask - non-interactive mode");
            return;
        }

        let servers = self.client.list_servers().await;
        let tools = self.client.list_tools().await;

        println!("{}", "Wikipedia MCP agent is ready.".bold());
        println!(
            "{}",
            format!(
                "Connected to {} ({} tools)",
                servers.join(", "),
                tools.len()
            )
            .dark_grey()
        );
        println!("{}", "─".repeat(terminal_width().min(72)).dark_grey());
        println!("{}", format_help());
    }

    fn print_error(&self, error: &anyhow::Error) {
        if self.is_interactive {
            eprintln!("{} {:#}", "Error:".red().bold(), error);
        } else {
            eprintln!("Error: {:#}", error);
        }
    }
}
