// wikiask - main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use wikiask::agent::Agent;
use wikiask::cli::{format_tools, Repl};
use wikiask::config::{load_config, Config};
use wikiask::logging::init_tracing;
use wikiask::providers::create_provider;
use wikiask::tools::mcp::McpClient;
use wikiask::tools::ToolExecutor;

#[derive(Parser)]
#[command(name = "wikiask")]
#[command(about = "Ask questions answered by a hosted model using MCP tools", version)]
struct Cli {
    /// Config file (default: ~/.wikiask/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model name, overriding config and environment
    #[arg(long, global = true)]
    model: Option<String>,

    /// Root URL of the OpenAI-compatible server
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Debug logging for wikiask (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one question and print the answer
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List the tools discovered on the MCP servers
    Tools,
    /// Interactive session (default)
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    config.apply_overrides(cli.model, cli.base_url);
    config
        .validate()
        .context("Configuration validation failed")?;

    let client = Arc::new(McpClient::from_config(&config.mcp_servers).await?);

    let result = match cli.command.unwrap_or(Command::Repl) {
        Command::Ask { question } => {
            let mut agent = build_agent(&config, &client).await?;
            agent
                .ask(&question.join(" "))
                .await
                .map(|answer| println!("{}", answer))
        }
        Command::Tools => {
            println!("{}", format_tools(&client.list_tools().await));
            Ok(())
        }
        Command::Repl => match build_agent(&config, &client).await {
            Ok(agent) => Repl::new(client.clone(), agent).run().await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = client.disconnect_all().await {
        tracing::warn!("Error while stopping MCP servers: {}", e);
    }

    result
}

async fn build_agent(config: &Config, client: &Arc<McpClient>) -> Result<Agent> {
    let provider = create_provider(&config.provider)?;
    let executor = ToolExecutor::new(client.clone());

    tracing::info!(
        "Using {} model {}",
        provider.name(),
        provider.default_model()
    );

    // Servers may describe how their tools are meant to be used
    let mut agent_config = config.agent.clone();
    for (server, instructions) in client.instructions().await {
        tracing::debug!("Adding instructions from MCP server '{}'", server);
        agent_config.system_prompt.push_str("\n\n");
        agent_config.system_prompt.push_str(&instructions);
    }

    Ok(Agent::new(provider, executor, agent_config).with_temperature(config.provider.temperature()))
}
