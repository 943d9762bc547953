use std::ops::ControlFlow;
use std::path::Path;

use convsearch_common::{Error, Result, Role};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use tracing::debug;

use crate::message::ArchivedMessage;

/// Coarse, database-side filter for one fetch.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter<'a> {
    /// Case-sensitive substring matched against content or conversation title.
    pub text: Option<&'a str>,
    pub roles: &'a [Role],
    pub fetch_limit: usize,
}

/// Read-only handle on a canonical conversation export.
///
/// The connection is opened per search and closed when the archive is dropped.
pub struct ConversationArchive {
    conn: Connection,
}

impl ConversationArchive {
    pub fn open(db_path: &Path) -> Result<Self> {
        debug!("opening conversation archive at {}", db_path.display());
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        Ok(Self { conn })
    }

    /// Streams matching messages newest-first (by the raw `create_time`
    /// column) into `visit` until it breaks or the fetch limit is reached.
    ///
    /// Rows are ordered by SQLite's native comparison of whatever is stored, so
    /// numeric and textual creation times do not interleave chronologically.
    pub fn for_each_message<F>(&self, filter: &MessageFilter<'_>, mut visit: F) -> Result<()>
    where
        F: FnMut(ArchivedMessage) -> ControlFlow<()>,
    {
        let (sql, params) = build_query(filter);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::Database(format!("failed to prepare search query: {e}")))?;

        let rows = stmt
            .query_map(params_from_iter(params.iter()), ArchivedMessage::from_row)
            .map_err(|e| Error::Database(format!("failed to execute search query: {e}")))?;

        for row in rows {
            let message =
                row.map_err(|e| Error::Database(format!("failed to read message row: {e}")))?;
            if visit(message).is_break() {
                break;
            }
        }

        Ok(())
    }
}

fn build_query(filter: &MessageFilter<'_>) -> (String, Vec<Value>) {
    let mut sql = String::from(
        "SELECT m.role, m.content, m.create_time, m.conversation_id, c.title
         FROM messages m
         JOIN conversations c ON c.id = m.conversation_id
         WHERE 1=1",
    );
    let mut params: Vec<Value> = Vec::new();

    if let Some(text) = filter.text {
        sql.push_str(" AND (instr(m.content, ?) > 0 OR instr(c.title, ?) > 0)");
        params.push(Value::Text(text.to_string()));
        params.push(Value::Text(text.to_string()));
    }

    if !filter.roles.is_empty() {
        let placeholders = vec!["?"; filter.roles.len()].join(", ");
        sql.push_str(&format!(" AND m.role IN ({placeholders})"));
        params.extend(
            filter
                .roles
                .iter()
                .map(|role| Value::Text(role.as_str().to_string())),
        );
    }

    sql.push_str(" ORDER BY m.create_time DESC LIMIT ?");
    params.push(Value::Integer(
        i64::try_from(filter.fetch_limit).unwrap_or(i64::MAX),
    ));

    (sql, params)
}
