// Request surface of one running MCP client session

use async_trait::async_trait;
use rust_mcp_sdk::error::SdkResult;
use rust_mcp_sdk::mcp_client::ClientRuntime;
use rust_mcp_sdk::schema::{
    CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult,
    InitializeResult, ListPromptsResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParams, ReadResourceRequestParams, ReadResourceResult,
};
use rust_mcp_sdk::McpClient as SdkClient;

/// The MCP requests a connection issues against a started client.
///
/// `ClientRuntime` is the production implementation; tests substitute
/// scripted sessions.
#[async_trait]
pub trait McpSession: Send + Sync {
    /// Result of the initialize handshake
    fn server_details(&self) -> Option<InitializeResult>;

    async fn tool_page(&self, cursor: Option<String>) -> SdkResult<ListToolsResult>;

    async fn call_tool(&self, params: CallToolRequestParams) -> SdkResult<CallToolResult>;

    async fn prompt_page(&self, cursor: Option<String>) -> SdkResult<ListPromptsResult>;

    async fn get_prompt(&self, params: GetPromptRequestParams) -> SdkResult<GetPromptResult>;

    async fn resource_page(&self, cursor: Option<String>) -> SdkResult<ListResourcesResult>;

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
    ) -> SdkResult<ReadResourceResult>;

    async fn shut_down(&self) -> SdkResult<()>;
}

fn page(cursor: Option<String>) -> Option<PaginatedRequestParams> {
    cursor.map(|cursor| PaginatedRequestParams {
        cursor: Some(cursor),
        meta: None,
    })
}

#[async_trait]
impl McpSession for ClientRuntime {
    fn server_details(&self) -> Option<InitializeResult> {
        SdkClient::server_info(self)
    }

    async fn tool_page(&self, cursor: Option<String>) -> SdkResult<ListToolsResult> {
        self.request_tool_list(page(cursor)).await
    }

    async fn call_tool(&self, params: CallToolRequestParams) -> SdkResult<CallToolResult> {
        self.request_tool_call(params).await
    }

    async fn prompt_page(&self, cursor: Option<String>) -> SdkResult<ListPromptsResult> {
        self.request_prompt_list(page(cursor)).await
    }

    async fn get_prompt(&self, params: GetPromptRequestParams) -> SdkResult<GetPromptResult> {
        self.request_prompt(params).await
    }

    async fn resource_page(&self, cursor: Option<String>) -> SdkResult<ListResourcesResult> {
        self.request_resource_list(page(cursor)).await
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
    ) -> SdkResult<ReadResourceResult> {
        self.request_resource_read(params).await
    }

    async fn shut_down(&self) -> SdkResult<()> {
        SdkClient::shut_down(self).await
    }
}
