use std::collections::BTreeSet;
use std::sync::Arc;

use convsearch_common::{Error, Result, Role};
use convsearch_db::{ConversationSearch, DEFAULT_LIMIT, SearchParams};
use rmcp::model::{JsonObject, Tool};
use serde_json::{Value, json};
use tracing::error;

pub const TOOL_NAME: &str = "conversation_search";

/// Upper clamp for `limit`, applied regardless of what the client sends.
pub const MAX_LIMIT: usize = 200;

const TOOL_DESCRIPTION: &str = "Search prior conversation history (canonical ChatGPT export). \
    Text match on message content and conversation titles. Optional filters: roles \
    (user/assistant/tool), start_date and end_date (ISO 8601 inclusive). Returns matching \
    messages with timestamps and content.";

/// The `conversation_search` tool: argument coercion, validation and error
/// rendering around a [`ConversationSearch`] backend.
pub struct SearchTool {
    backend: Arc<dyn ConversationSearch>,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn ConversationSearch>) -> Self {
        Self { backend }
    }

    pub fn definition() -> Tool {
        Tool::new(TOOL_NAME, TOOL_DESCRIPTION, Arc::new(input_schema()))
    }

    /// Runs one tool call. Every outcome, including failures, is rendered as
    /// the text returned to the caller.
    pub fn call(&self, name: &str, arguments: Option<&JsonObject>) -> String {
        if name != TOOL_NAME {
            return format!("Unknown tool: {name}");
        }

        let empty = JsonObject::new();
        let arguments = arguments.unwrap_or(&empty);

        match parse_arguments(arguments).and_then(|params| self.backend.search(&params)) {
            Ok(text) => text,
            Err(e) => render_error(e),
        }
    }
}

pub fn input_schema() -> JsonObject {
    let roles: Vec<&str> = Role::ALL.iter().map(Role::as_str).collect();
    let schema = json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search string. Matches message content and conversation title (case-sensitive substring)."
            },
            "roles": {
                "type": "array",
                "items": { "type": "string", "enum": roles },
                "description": "Filter by message role(s). e.g. [\"user\"], [\"assistant\"], or [\"user\", \"assistant\"]."
            },
            "start_date": {
                "type": "string",
                "description": "Start of date range (ISO 8601), inclusive. e.g. \"2024-01-15\" or \"2024-01-15T14:30\"."
            },
            "end_date": {
                "type": "string",
                "description": "End of date range (ISO 8601), inclusive; full day if date-only. e.g. \"2024-01-20\"."
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of results to return.",
                "default": DEFAULT_LIMIT
            }
        },
        "required": [],
        "additionalProperties": false
    });

    match schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// Coerces raw tool arguments into [`SearchParams`].
///
/// Unknown roles are rejected; a non-array `roles` becomes a one-element list;
/// a `limit` that is not an integer falls back to the default; the limit is
/// clamped into `1..=MAX_LIMIT`; empty strings count as absent.
pub fn parse_arguments(arguments: &JsonObject) -> Result<SearchParams> {
    Ok(SearchParams {
        query: optional_text(arguments, "query")?,
        roles: parse_roles(arguments.get("roles"))?,
        start_date: optional_text(arguments, "start_date")?,
        end_date: optional_text(arguments, "end_date")?,
        limit: parse_limit(arguments.get("limit")),
    })
}

fn optional_text(arguments: &JsonObject, key: &str) -> Result<Option<String>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(scalar.to_string())),
        Some(_) => Err(Error::InvalidInput(format!("{key} must be a string"))),
    }
}

fn parse_roles(value: Option<&Value>) -> Result<Vec<Role>> {
    let items: Vec<&Value> = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };

    let mut roles = Vec::with_capacity(items.len());
    let mut invalid = BTreeSet::new();
    for item in items {
        match item.as_str().and_then(|s| s.parse::<Role>().ok()) {
            Some(role) => roles.push(role),
            None => {
                invalid.insert(quoted(item));
            }
        }
    }

    if !invalid.is_empty() {
        let allowed: Vec<&str> = Role::ALL.iter().map(Role::as_str).collect();
        return Err(Error::InvalidInput(format!(
            "Invalid role(s): [{}]. Allowed: {}.",
            invalid.into_iter().collect::<Vec<_>>().join(", "),
            allowed.join(", ")
        )));
    }

    Ok(roles)
}

fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

fn parse_limit(value: Option<&Value>) -> usize {
    let default = DEFAULT_LIMIT as i64;
    let requested = match value {
        None | Some(Value::Null) => default,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(default),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(_) => default,
    };

    requested.clamp(1, MAX_LIMIT as i64) as usize
}

/// Caller-facing text for a failed call. Unexpected failures are logged in
/// full; the caller only sees the message.
pub fn render_error(err: Error) -> String {
    match err {
        Error::InvalidInput(msg) => msg,
        Error::NotFound(msg) => format!("Database not found: {msg}"),
        other => {
            error!("call_tool {TOOL_NAME} failed: {other:?}");
            format!("Error: {other}")
        }
    }
}
