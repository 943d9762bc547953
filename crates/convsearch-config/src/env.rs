//! Environment lookups. Callers pass a lookup function so nothing here reads
//! process state on its own; the binary hands in `std::env::var`.

use std::path::PathBuf;

/// Variables naming an explicit archive database, in precedence order.
pub const DB_OVERRIDE_VARS: [&str; 2] = ["CONVERSATION_DB", "ORIGIN_CONVERSATION_DB"];

/// Returns the override candidate from the first variable that is set and
/// non-empty. A later variable is never consulted once an earlier one is set,
/// even if the earlier one points at a missing file.
pub fn select_db_override<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    DB_OVERRIDE_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Parses a port from `name`, falling back to `default` when the variable is
/// unset, empty or not a valid port.
pub fn env_port<F>(lookup: F, name: &str, default: u16) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match raw.trim().parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                if !raw.trim().is_empty() {
                    tracing::warn!("ignoring invalid {name}={raw:?}, using {default}");
                }
                default
            }
        },
        None => default,
    }
}
