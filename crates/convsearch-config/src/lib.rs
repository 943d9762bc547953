pub mod env;
pub mod loader;
pub mod model;

pub use env::{DB_OVERRIDE_VARS, env_port, select_db_override};
pub use loader::ConfigLoader;
pub use model::{AppConfig, DatabaseConfig, ServerConfig};
