pub mod archive;
pub mod message;
pub mod resolver;
pub mod search;
pub mod timestamp;

pub use archive::ConversationArchive;
pub use message::ArchivedMessage;
pub use resolver::PathResolver;
pub use search::{ConversationSearch, DEFAULT_LIMIT, NO_MATCHES, QueryEngine, SearchParams};
pub use timestamp::{DateRange, Timestamp};
