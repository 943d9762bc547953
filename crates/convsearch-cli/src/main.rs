use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use convsearch_config::{AppConfig, ConfigLoader, env_port, select_db_override};
use convsearch_db::{PathResolver, QueryEngine};
use convsearch_server::{ConversationSearchServer, serve_http, serve_stdio};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "convsearch",
    version,
    about = "conversation_search MCP server over a read-only conversation archive",
    after_help = "Transport:\n  Default          stdio, for local agent/IDE process configs.\n  --http           streamable HTTP at /mcp, for remote or shared hosts.\n\nDatabase:\n  CONVERSATION_DB or ORIGIN_CONVERSATION_DB names the archive file;\n  otherwise the newest *.db in the configured fallback directory is used."
)]
struct Cli {
    /// Serve over streamable HTTP instead of stdio
    #[arg(long)]
    http: bool,

    /// Host for HTTP (default: config, then 127.0.0.1)
    #[arg(long, env = "MCP_HOST")]
    host: Option<String>,

    /// Port for HTTP (default: MCP_PORT, then config, then 8000)
    #[arg(long)]
    port: Option<u16>,

    /// Bind HTTP to 0.0.0.0 (allow external connections)
    #[arg(long)]
    allow_external: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// Directory holding config.yml / config.toml
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

impl Cli {
    fn http_addr(&self, config: &AppConfig, env: impl Fn(&str) -> Option<String>) -> String {
        let host = if self.allow_external {
            "0.0.0.0".to_string()
        } else {
            self.host
                .clone()
                .unwrap_or_else(|| config.server.host.clone())
        };
        let port = self
            .port
            .unwrap_or_else(|| env_port(env, "MCP_PORT", config.server.port));
        format!("{host}:{port}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());

    // stdout carries JSON-RPC in stdio mode.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let env = |name: &str| std::env::var(name).ok();
    let override_path = select_db_override(env).or_else(|| config.database.path.clone());
    let resolver = PathResolver::new(override_path, config.database.fallback_dir());
    info!(
        "database fallback directory: {}",
        resolver.fallback_dir().display()
    );

    let server = ConversationSearchServer::new(Arc::new(QueryEngine::new(resolver)));

    if cli.http {
        if cli.allow_external {
            warn!("external connections allowed (--allow-external)");
        }
        let addr = cli.http_addr(&config, env);
        serve_http(server, &addr).await?;
    } else {
        serve_stdio(server).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use convsearch_config::AppConfig;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_to_stdio() {
        let cli = Cli::try_parse_from(["convsearch"]).unwrap();
        assert!(!cli.http);
        assert!(!cli.allow_external);
        assert!(cli.port.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn http_flags_parse() {
        let cli = Cli::try_parse_from([
            "convsearch",
            "--http",
            "--port",
            "9000",
            "--host",
            "127.0.0.2",
        ])
        .unwrap();
        assert!(cli.http);
        assert_eq!(cli.http_addr(&AppConfig::default(), no_env), "127.0.0.2:9000");
    }

    #[test]
    fn http_addr_falls_back_to_env_then_config() {
        let mut cli = Cli::try_parse_from(["convsearch", "--http"]).unwrap();
        cli.host = None;
        let config = AppConfig::default();

        assert_eq!(cli.http_addr(&config, no_env), "127.0.0.1:8000");
        assert_eq!(
            cli.http_addr(&config, |name| (name == "MCP_PORT").then(|| "9100".to_string())),
            "127.0.0.1:9100"
        );
        assert_eq!(
            cli.http_addr(&config, |name| (name == "MCP_PORT").then(|| "bogus".to_string())),
            "127.0.0.1:8000"
        );
    }

    #[test]
    fn allow_external_binds_all_interfaces() {
        let cli = Cli::try_parse_from(["convsearch", "--http", "--allow-external", "--port", "8100"])
            .unwrap();
        assert_eq!(cli.http_addr(&AppConfig::default(), no_env), "0.0.0.0:8100");
    }
}
