// REPL command parsing and handling

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::agent::Agent;
use crate::tools::mcp::content::{first_prompt_text, resource_text};
use crate::tools::mcp::{McpClient, McpError, ServerPrompt, ServerResource};
use crate::tools::ToolDefinition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    Clear,
    ListPrompts,
    Prompt { name: String, args: Vec<String> },
    ListResources,
    Resource { id: String },
    /// Command given without its required argument
    Usage(&'static str),
    Question(String),
    Empty,
}

impl Command {
    /// Classify one line of REPL input.
    ///
    /// Fails only when `/prompt` or `/resource` arguments have unbalanced quotes.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Command::Empty);
        }

        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
            return Ok(Command::Quit);
        }

        let keyword = input.split_whitespace().next().unwrap_or_default();
        let command = match keyword {
            "/help" => Command::Help,
            "/clear" => Command::Clear,
            "/prompts" => Command::ListPrompts,
            "/resources" => Command::ListResources,
            "/prompt" => {
                let mut parts = split_quoted(input)?.into_iter().skip(1);
                match parts.next() {
                    Some(name) => Command::Prompt {
                        name,
                        args: parts.collect(),
                    },
                    None => Command::Usage("/prompt <name> \"arg1\" \"arg2\" ..."),
                }
            }
            "/resource" => match split_quoted(input)?.into_iter().nth(1) {
                Some(id) => Command::Resource { id },
                None => Command::Usage("/resource <name|number>"),
            },
            _ => Command::Question(input.to_string()),
        };
        Ok(command)
    }
}

fn split_quoted(input: &str) -> Result<Vec<String>> {
    shlex::split(input).context("Unbalanced quotes in command arguments")
}

/// Run a non-quit command and return the text to print
pub async fn handle_command(
    command: Command,
    client: &McpClient,
    agent: &mut Agent,
) -> Result<String> {
    match command {
        Command::Help => Ok(format_help()),
        Command::Clear => {
            agent.reset();
            Ok("Conversation cleared.".to_string())
        }
        Command::ListPrompts => Ok(format_prompts(&client.list_prompts().await?)),
        Command::Prompt { name, args } => run_prompt(client, agent, &name, args).await,
        Command::ListResources => Ok(format_resources(&client.list_resources().await?)),
        Command::Resource { id } => show_resource(client, &id).await,
        Command::Usage(usage) => Ok(format!("Usage: {}", usage)),
        Command::Question(question) => Ok(format!("AI: {}", agent.ask(&question).await?)),
        Command::Quit => Ok("Goodbye!".to_string()),
        Command::Empty => Ok(String::new()),
    }
}

pub fn format_help() -> String {
    r#"Type a question or use the following commands:
  /prompts                  - list available prompts
  /prompt <name> "args"     - run a specific prompt
  /resources                - list available resources
  /resource <name|number>   - show a specific resource
  /clear                    - start a new conversation
  /help                     - show this message
  exit | quit | q           - leave"#
        .to_string()
}

pub fn format_prompts(prompts: &[ServerPrompt]) -> String {
    if prompts.is_empty() {
        return "No prompts found on the server.".to_string();
    }

    let mut output = String::from("\nAvailable Prompts and Argument Structure:\n");
    for ServerPrompt { prompt, .. } in prompts {
        output.push_str(&format!("\nPrompt: {}\n", prompt.name));
        if prompt.arguments.is_empty() {
            output.push_str("  - No arguments required.\n");
        }
        for arg in &prompt.arguments {
            output.push_str(&format!("  - {}\n", arg.name));
        }
    }
    output.push_str("\nUse: /prompt <prompt_name> \"arg1\" \"arg2\" ...");
    output
}

/// Fetch a prompt, send its first message to the model, return the answer
async fn run_prompt(
    client: &McpClient,
    agent: &mut Agent,
    name: &str,
    args: Vec<String>,
) -> Result<String> {
    let ServerPrompt { server, prompt } = client.find_prompt(name).await?;

    if args.len() != prompt.arguments.len() {
        let expected: Vec<&str> = prompt.arguments.iter().map(|a| a.name.as_str()).collect();
        anyhow::bail!(
            "Expected {} arguments: {}",
            prompt.arguments.len(),
            expected.join(", ")
        );
    }

    let arguments: HashMap<String, String> = prompt
        .arguments
        .iter()
        .map(|a| a.name.clone())
        .zip(args)
        .collect();

    let result = client
        .get_prompt(&server, name, arguments)
        .await
        .with_context(|| format!("Prompt invocation failed for '{}'", name))?;
    let text = first_prompt_text(&result)
        .with_context(|| format!("Prompt '{}' returned no text message", name))?;

    let answer = agent.ask(text).await?;
    Ok(format!("\n=== Prompt Result ===\n{}", answer))
}

pub fn format_resources(resources: &[ServerResource]) -> String {
    if resources.is_empty() {
        return "No resources found on the server.".to_string();
    }

    let mut output = String::from("\nAvailable Resources:\n");
    for (i, ServerResource { resource, .. }) in resources.iter().enumerate() {
        output.push_str(&format!("[{}] {}\n", i + 1, resource.name));
    }
    output.push_str("\nUse: /resource <name> to view its content.");
    output
}

/// Find a resource by its 1-based list position or its name
pub fn resolve_resource<'a>(resources: &'a [ServerResource], id: &str) -> Option<&'a ServerResource> {
    let by_index = id
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| resources.get(i));
    by_index.or_else(|| resources.iter().find(|r| r.resource.name == id))
}

async fn show_resource(client: &McpClient, id: &str) -> Result<String> {
    let resources = client.list_resources().await?;
    let found = resolve_resource(&resources, id)
        .ok_or_else(|| McpError::UnknownResource(id.to_string()))?;

    let result = client
        .read_resource(&found.server, &found.resource.uri)
        .await
        .with_context(|| format!("Resource fetch failed for '{}'", found.resource.name))?;

    let texts: Vec<&str> = result
        .contents
        .iter()
        .filter_map(resource_text)
        .collect();
    if texts.is_empty() {
        return Ok(format!(
            "Resource '{}' has no text content.",
            found.resource.name
        ));
    }

    Ok(texts
        .iter()
        .map(|text| format!("\n=== Resource Text ===\n{}", text))
        .collect::<Vec<_>>()
        .join("\n"))
}

pub fn format_tools(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return "No tools found on the configured MCP servers.".to_string();
    }

    let mut output = format!("Available tools ({}):\n", tools.len());
    for tool in tools {
        output.push_str(&format!("\n  {}\n", tool.name));
        if !tool.description.is_empty() {
            output.push_str(&format!("    {}\n", tool.description.trim()));
        }
        if !tool.input_schema.required.is_empty() {
            output.push_str(&format!(
                "    required: {}\n",
                tool.input_schema.required.join(", ")
            ));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quit_words_are_case_insensitive() {
        for word in ["exit", "QUIT", "Q", "  quit  "] {
            assert_eq!(Command::parse(word).unwrap(), Command::Quit);
        }
        assert_eq!(
            Command::parse("quit smoking tips").unwrap(),
            Command::Question("quit smoking tips".to_string())
        );
    }

    #[test]
    fn test_prompts_is_not_prompt() {
        assert_eq!(Command::parse("/prompts").unwrap(), Command::ListPrompts);
        assert_eq!(Command::parse("/resources").unwrap(), Command::ListResources);
    }

    #[test]
    fn test_prompt_arguments_are_shell_quoted() {
        assert_eq!(
            Command::parse(r#"/prompt highlight_sections "Alan Turing" 'Early life'"#).unwrap(),
            Command::Prompt {
                name: "highlight_sections".to_string(),
                args: vec!["Alan Turing".to_string(), "Early life".to_string()],
            }
        );
        assert!(Command::parse(r#"/prompt x "open"#).is_err());
    }

    #[test]
    fn test_missing_arguments_give_usage() {
        assert!(matches!(Command::parse("/prompt").unwrap(), Command::Usage(_)));
        assert!(matches!(Command::parse("/resource").unwrap(), Command::Usage(_)));
    }

    #[test]
    fn test_everything_else_is_a_question() {
        assert_eq!(Command::parse("").unwrap(), Command::Empty);
        assert_eq!(
            Command::parse("/unknown thing").unwrap(),
            Command::Question("/unknown thing".to_string())
        );
    }

    fn resource(name: &str) -> ServerResource {
        ServerResource {
            server: "wikipedia".to_string(),
            resource: serde_json::from_value(json!({
                "uri": format!("wiki://{}", name),
                "name": name,
            }))
            .unwrap(),
        }
    }

    #[test]
    fn test_resolve_resource_by_index_or_name() {
        let resources = vec![resource("featured"), resource("on_this_day")];
        assert_eq!(resolve_resource(&resources, "2").unwrap().resource.name, "on_this_day");
        assert_eq!(resolve_resource(&resources, "featured").unwrap().resource.uri, "wiki://featured");
        assert!(resolve_resource(&resources, "0").is_none());
        assert!(resolve_resource(&resources, "3").is_none());
    }

    #[test]
    fn test_format_resources_numbers_from_one() {
        let out = format_resources(&[resource("featured")]);
        assert!(out.contains("[1] featured"));
        assert_eq!(format_resources(&[]), "No resources found on the server.");
    }

    #[test]
    fn test_format_prompts_lists_arguments() {
        let prompts = vec![ServerPrompt {
            server: "wikipedia".to_string(),
            prompt: serde_json::from_value(json!({
                "name": "highlight_sections",
                "arguments": [{"name": "topic", "required": true}]
            }))
            .unwrap(),
        }];
        let out = format_prompts(&prompts);
        assert!(out.contains("Prompt: highlight_sections"));
        assert!(out.contains("  - topic"));
        assert_eq!(format_prompts(&[]), "No prompts found on the server.");
    }
}
