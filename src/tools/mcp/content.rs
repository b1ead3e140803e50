// Text rendering of MCP content for the model and the terminal

use rust_mcp_sdk::schema::{
    CallToolResult, ContentBlock, EmbeddedResourceResource, GetPromptResult, ReadResourceContent,
};

/// Text carried by a content block, if it has any
pub fn block_text(block: &ContentBlock) -> Option<&str> {
    match block {
        ContentBlock::TextContent(content) => Some(&content.text),
        ContentBlock::EmbeddedResource(embedded) => match &embedded.resource {
            EmbeddedResourceResource::TextResourceContents(contents) => Some(&contents.text),
            EmbeddedResourceResource::BlobResourceContents(_) => None,
        },
        _ => None,
    }
}

/// Text for a block, with a short placeholder for non-text content
pub fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::TextContent(content) => content.text.clone(),
        ContentBlock::ImageContent(image) => format!("[image: {}]", image.mime_type),
        ContentBlock::AudioContent(audio) => format!("[audio: {}]", audio.mime_type),
        ContentBlock::ResourceLink(link) => format!("[resource link: {} ({})]", link.name, link.uri),
        ContentBlock::EmbeddedResource(embedded) => match &embedded.resource {
            EmbeddedResourceResource::TextResourceContents(contents) => contents.text.clone(),
            EmbeddedResourceResource::BlobResourceContents(blob) => {
                format!("[binary resource: {}]", blob.uri)
            }
        },
    }
}

/// Tool output joined into the single string the model sees
pub fn tool_result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn tool_result_failed(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}

/// Text of the first prompt message, which is what gets sent to the model
pub fn first_prompt_text(result: &GetPromptResult) -> Option<&str> {
    result
        .messages
        .first()
        .and_then(|message| block_text(&message.content))
}

/// Text of a resource item; blobs have none
pub fn resource_text(content: &ReadResourceContent) -> Option<&str> {
    match content {
        ReadResourceContent::TextResourceContents(contents) => Some(&contents.text),
        ReadResourceContent::BlobResourceContents(_) => None,
    }
}
