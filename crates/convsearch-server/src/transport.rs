use convsearch_common::{Error, Result};
use rmcp::ServiceExt;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use tokio::net::TcpListener;
use tracing::info;

use crate::handler::ConversationSearchServer;

/// Path the streamable HTTP endpoint is mounted at.
pub const HTTP_MCP_PATH: &str = "/mcp";

/// Serves over stdin/stdout until the client disconnects.
pub async fn serve_stdio(server: ConversationSearchServer) -> Result<()> {
    info!("serving conversation_search over stdio");
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| Error::Server(format!("stdio handshake failed: {e}")))?;

    let reason = service
        .waiting()
        .await
        .map_err(|e| Error::Server(format!("stdio transport failed: {e}")))?;
    info!("stdio transport closed: {reason:?}");

    Ok(())
}

/// Serves the streamable HTTP transport on `addr` until Ctrl-C.
pub async fn serve_http(server: ConversationSearchServer, addr: &str) -> Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service(HTTP_MCP_PATH, service);

    let listener = TcpListener::bind(addr).await?;
    info!("serving conversation_search on http://{addr}{HTTP_MCP_PATH}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down HTTP transport");
        })
        .await
        .map_err(|e| Error::Server(format!("server error: {e}")))?;

    Ok(())
}
