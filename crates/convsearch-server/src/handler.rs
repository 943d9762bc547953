use std::sync::Arc;

use convsearch_db::ConversationSearch;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use tracing::{debug, error};

use crate::tool::SearchTool;

pub const SERVER_NAME: &str = "origin-conversation-mcp";

const INSTRUCTIONS: &str = "Use conversation_search to look up prior conversation history. \
    All parameters are optional; results are plain text, newest first.";

/// MCP server exposing the single `conversation_search` tool.
///
/// Searches are synchronous SQLite reads, so each call runs on a blocking
/// thread. Nothing is shared between calls except the immutable backend.
#[derive(Clone)]
pub struct ConversationSearchServer {
    tool: Arc<SearchTool>,
}

impl ConversationSearchServer {
    pub fn new(backend: Arc<dyn ConversationSearch>) -> Self {
        Self {
            tool: Arc::new(SearchTool::new(backend)),
        }
    }

    /// Runs one call off the async runtime and returns the caller-facing text.
    pub async fn dispatch(&self, request: CallToolRequestParams) -> String {
        let tool = Arc::clone(&self.tool);
        debug!("call_tool {}", request.name);

        tokio::task::spawn_blocking(move || tool.call(&request.name, request.arguments.as_ref()))
            .await
            .unwrap_or_else(|e| {
                error!("call_tool task failed: {e}");
                format!("Error: {e}")
            })
    }
}

impl ServerHandler for ConversationSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(Implementation::new(SERVER_NAME, env!("CARGO_PKG_VERSION")))
            .with_instructions(INSTRUCTIONS)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(vec![SearchTool::definition()]))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let text = self.dispatch(request).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationSearchServer, SERVER_NAME};
    use convsearch_common::Result;
    use convsearch_db::{ConversationSearch, SearchParams};
    use rmcp::ServerHandler;
    use rmcp::model::CallToolRequestParams;
    use std::sync::Arc;

    struct Echo;

    impl ConversationSearch for Echo {
        fn search(&self, params: &SearchParams) -> Result<String> {
            Ok(format!("limit={}", params.limit))
        }
    }

    struct Panics;

    impl ConversationSearch for Panics {
        fn search(&self, _params: &SearchParams) -> Result<String> {
            panic!("backend exploded");
        }
    }

    fn request(name: &'static str, arguments: serde_json::Value) -> CallToolRequestParams {
        let request = CallToolRequestParams::new(name);
        match arguments {
            serde_json::Value::Object(map) => request.with_arguments(map),
            _ => request,
        }
    }

    #[test]
    fn info_carries_version_and_instructions() {
        let info = ConversationSearchServer::new(Arc::new(Echo)).get_info();

        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert!(info
            .instructions
            .as_deref()
            .is_some_and(|text| text.contains("conversation_search")));
    }

    #[test]
    fn info_advertises_tools() {
        let server = ConversationSearchServer::new(Arc::new(Echo));
        let info = server.get_info();

        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn dispatch_runs_search_with_clamped_limit() {
        let server = ConversationSearchServer::new(Arc::new(Echo));
        let out = server
            .dispatch(request(
                "conversation_search",
                serde_json::json!({ "limit": 999 }),
            ))
            .await;

        assert_eq!(out, "limit=200");
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_tool() {
        let server = ConversationSearchServer::new(Arc::new(Echo));
        let out = server
            .dispatch(request("other", serde_json::json!({})))
            .await;

        assert_eq!(out, "Unknown tool: other");
    }

    #[tokio::test]
    async fn dispatch_survives_backend_panic() {
        let server = ConversationSearchServer::new(Arc::new(Panics));
        let out = server
            .dispatch(request("conversation_search", serde_json::json!({})))
            .await;

        assert!(out.starts_with("Error: "));
    }
}
