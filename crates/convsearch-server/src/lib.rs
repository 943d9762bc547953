pub mod handler;
pub mod tool;
pub mod transport;

pub use handler::{ConversationSearchServer, SERVER_NAME};
pub use tool::{MAX_LIMIT, SearchTool, TOOL_NAME};
pub use transport::{serve_http, serve_stdio};
